// src/openapi.rs

use crate::models::{
    CommissionPolicy, CreateDailyRecordRequest, CreateFixedExpenseRequest, CreatePayrollRequest,
    CreateVariableExpenseRequest, DailyRecord, Expense, ExpenseCategory, ExpenseFrequency,
    ExpenseStatus, FinancialSummary, FinancialSummaryResponse, FixedExpenseBreakdown,
    MarginHealth, MarkPayrollPaidRequest, Payroll, PayrollStatus, UnifiedExpenses,
    UpdateDailyRecordRequest, UpdateExpenseRequest,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Taxi Fleet API",
        version = "1.0.0",
        description = "Record-keeping and payroll API for a small taxi fleet, built with Rust and Axum. \
            Drivers log daily shift records (income by payment channel, expenses, kilometers); \
            administrators manage fixed and variable expenses, payroll, and period settlement \
            reports with commission-vs-salary reconciliation.",
        license(name = "MIT")
    ),
    paths(
        // Daily Records
        crate::handlers::records::create_record,
        crate::handlers::records::list_records,
        crate::handlers::records::get_record,
        crate::handlers::records::update_record,
        crate::handlers::records::delete_record,
        // Expenses
        crate::handlers::expenses::create_variable_expense,
        crate::handlers::expenses::create_fixed_expense,
        crate::handlers::expenses::list_expenses,
        crate::handlers::expenses::update_expense,
        crate::handlers::expenses::delete_expense,
        // Payroll
        crate::handlers::payroll::create_payroll,
        crate::handlers::payroll::list_payrolls,
        crate::handlers::payroll::get_payroll,
        crate::handlers::payroll::mark_payroll_paid,
        // Reports
        crate::handlers::reports::financial_summary,
    ),
    components(
        schemas(
            DailyRecord, CreateDailyRecordRequest, UpdateDailyRecordRequest, CommissionPolicy,
            Expense, CreateVariableExpenseRequest, CreateFixedExpenseRequest, UpdateExpenseRequest,
            ExpenseCategory, ExpenseStatus, ExpenseFrequency,
            Payroll, CreatePayrollRequest, MarkPayrollPaidRequest, PayrollStatus,
            FinancialSummary, FinancialSummaryResponse, FixedExpenseBreakdown, UnifiedExpenses,
            MarginHealth,
        )
    ),
    tags(
        (name = "Daily Records", description = "Driver shift records with per-day settlement"),
        (name = "Expenses", description = "Fixed monthly charges and one-off expenses"),
        (name = "Payroll", description = "Driver payroll entries and payment status"),
        (name = "Reports", description = "Period settlement summaries"),
    )
)]
pub struct ApiDoc;
