// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ─── Commission Policy ────────────────────────────────────────────────────────

/// How a day's driver commission is derived from the shift takings.
/// Every record stores the policy it was created under; historical rows are
/// never reinterpreted when the configured default changes.
// sqlx 0.8: custom Postgres enums need #[sqlx(type_name = "...")] on the enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "commission_policy", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommissionPolicy {
    /// Commission on gross takings, before any expense is subtracted.
    GrossRate,
    /// Commission on takings minus the day's fuel and other expenses.
    PostExpenseRate,
}

impl std::str::FromStr for CommissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gross" | "gross_rate" => Ok(CommissionPolicy::GrossRate),
            "post_expense" | "post_expense_rate" => Ok(CommissionPolicy::PostExpenseRate),
            other => Err(format!("unknown commission policy '{other}'")),
        }
    }
}

// ─── Daily Record ─────────────────────────────────────────────────────────────

/// One shift, one driver, one calendar date. Income is tracked per payment
/// channel; `total_amount`, `total_km`, `driver_commission` and `net_amount`
/// are derived server-side and never trusted from the client.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DailyRecord {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub date: NaiveDate,
    pub start_km: i32,
    pub end_km: i32,
    pub total_km: i32,
    pub cash_amount: Decimal,
    pub card_amount: Decimal,
    pub invoice_amount: Decimal,
    pub other_amount: Decimal,
    pub total_amount: Decimal,
    pub fuel_expense: Decimal,
    pub other_expenses: Decimal,
    pub commission_policy: CommissionPolicy,
    pub commission_rate: Decimal,
    pub driver_commission: Decimal,
    pub net_amount: Decimal,
    pub notes: Option<String>,
    pub shift_start: Option<String>,
    pub shift_end: Option<String>,
    pub shift_break: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDailyRecordRequest {
    pub driver_id: Uuid,
    pub date: NaiveDate,
    pub start_km: i32,
    pub end_km: i32,
    pub cash_amount: Decimal,
    #[serde(default)]
    pub card_amount: Decimal,
    #[serde(default)]
    pub invoice_amount: Decimal,
    #[serde(default)]
    pub other_amount: Decimal,
    #[serde(default)]
    pub fuel_expense: Decimal,
    #[serde(default)]
    pub other_expenses: Decimal,
    /// Defaults to the configured policy when omitted.
    pub commission_policy: Option<CommissionPolicy>,
    /// Defaults to the configured rate when omitted.
    pub commission_rate: Option<Decimal>,
    pub notes: Option<String>,
    pub shift_start: Option<String>,
    pub shift_end: Option<String>,
    pub shift_break: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDailyRecordRequest {
    pub start_km: Option<i32>,
    pub end_km: Option<i32>,
    pub cash_amount: Option<Decimal>,
    pub card_amount: Option<Decimal>,
    pub invoice_amount: Option<Decimal>,
    pub other_amount: Option<Decimal>,
    pub fuel_expense: Option<Decimal>,
    pub other_expenses: Option<Decimal>,
    pub commission_policy: Option<CommissionPolicy>,
    pub commission_rate: Option<Decimal>,
    pub notes: Option<String>,
    pub shift_start: Option<String>,
    pub shift_end: Option<String>,
    pub shift_break: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct RecordListParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub driver_id: Option<Uuid>,
}

// ─── Expense ──────────────────────────────────────────────────────────────────

/// Cost categories. The first block is the variable-expense screen set, the
/// second the business's fixed monthly charges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "expense_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Combustible,
    Mantenimiento,
    Reparacion,
    Seguro,
    Impuestos,
    SeguridadSocial,
    CuotaAutonomos,
    CuotaAsociacion,
    Gestoria,
    Suministros,
    Otros,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "expense_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "expense_frequency", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExpenseFrequency {
    Monthly,
    Quarterly,
    Biannual,
    Annual,
}

/// A fixed (recurring) or variable (one-off) cost line item.
/// `total_amount = amount + tax_amount` always holds; variable entries are
/// created through the total-with-VAT path that derives the split.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Expense {
    pub id: Uuid,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub is_recurring: bool,
    pub frequency: Option<ExpenseFrequency>,
    pub next_due_date: Option<NaiveDate>,
    pub status: ExpenseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVariableExpenseRequest {
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub description: String,
    /// VAT-inclusive total; the pre-tax base and the 21% IVA are derived.
    pub total_amount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFixedExpenseRequest {
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: Decimal,
    pub frequency: ExpenseFrequency,
    pub next_due_date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateExpenseRequest {
    pub category: Option<ExpenseCategory>,
    pub description: Option<String>,
    /// Variable entries only: new VAT-inclusive total, re-split on save.
    pub total_amount: Option<Decimal>,
    /// Fixed entries only: new pre-tax amount.
    pub amount: Option<Decimal>,
    pub frequency: Option<ExpenseFrequency>,
    pub next_due_date: Option<NaiveDate>,
    pub status: Option<ExpenseStatus>,
}

#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct ExpenseListParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// true = fixed/recurring only, false = variable only, omitted = both.
    pub recurring: Option<bool>,
}

// ─── Payroll ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "payroll_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayrollStatus {
    Pending,
    Paid,
}

/// One driver, one period. `net_amount = base_salary + commissions + bonuses
/// - deductions - tax_withholding`, recomputed server-side. The payslip PDF
/// lives in external storage; `pdf_url` is an opaque reference.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payroll {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub base_salary: Decimal,
    pub commissions: Decimal,
    pub bonuses: Decimal,
    pub deductions: Decimal,
    pub tax_withholding: Decimal,
    pub net_amount: Decimal,
    pub status: PayrollStatus,
    pub payment_date: Option<NaiveDate>,
    pub pdf_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePayrollRequest {
    pub driver_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub base_salary: Decimal,
    #[serde(default)]
    pub commissions: Decimal,
    #[serde(default)]
    pub bonuses: Decimal,
    #[serde(default)]
    pub deductions: Decimal,
    #[serde(default)]
    pub tax_withholding: Decimal,
    pub pdf_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkPayrollPaidRequest {
    /// Defaults to today when omitted.
    pub payment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct PayrollListParams {
    pub driver_id: Option<Uuid>,
}

// ─── Financial Summary ────────────────────────────────────────────────────────

/// Monthly fixed charges bucketed into the seven business categories.
/// Categories with no entries stay at zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct FixedExpenseBreakdown {
    pub seguridad_social: Decimal,
    pub cuota_autonomos: Decimal,
    pub cuota_asociacion: Decimal,
    pub gestoria: Decimal,
    pub seguro: Decimal,
    pub suministros: Decimal,
    pub otros: Decimal,
}

impl FixedExpenseBreakdown {
    pub fn total(&self) -> Decimal {
        self.seguridad_social
            + self.cuota_autonomos
            + self.cuota_asociacion
            + self.gestoria
            + self.seguro
            + self.suministros
            + self.otros
    }
}

/// All non-commission expenses of a period. Driver commission is deliberately
/// excluded here and subtracted once, separately, in the net-profit formula.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UnifiedExpenses {
    pub monthly_fixed_expenses: FixedExpenseBreakdown,
    pub daily_operational_expenses: Decimal,
    pub variable_expenses: Decimal,
    pub total_expenses: Decimal,
}

/// The settlement calculator's output for a period.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct FinancialSummary {
    pub total_income: Decimal,
    pub driver_commission: Decimal,
    /// Commission capped at the period's base salary (payslip portion).
    pub nomina_real: Decimal,
    /// Commission above the base salary, paid out in cash; floored at zero.
    pub efectivo_adicional: Decimal,
    pub unified_expenses: UnifiedExpenses,
    pub real_net_profit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MarginHealth {
    pub profit_margin_pct: Decimal,
    pub is_healthy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinancialSummaryResponse {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub driver_id: Option<Uuid>,
    /// Base salary the commission split was reconciled against.
    pub base_salary: Decimal,
    pub summary: FinancialSummary,
    pub margin: MarginHealth,
}

#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct SummaryParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub driver_id: Option<Uuid>,
}
