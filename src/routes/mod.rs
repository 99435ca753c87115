// src/routes/mod.rs

use crate::{
    handlers::{
        expenses::{
            create_fixed_expense, create_variable_expense, delete_expense, list_expenses,
            update_expense,
        },
        payroll::{create_payroll, get_payroll, list_payrolls, mark_payroll_paid},
        records::{create_record, delete_record, get_record, list_records, update_record},
        reports::financial_summary,
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, patch, post, put},
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // ─── Daily Records ────────────────────────────────────
        .route("/records", post(create_record).get(list_records))
        .route(
            "/records/{record_id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        // ─── Expenses ─────────────────────────────────────────
        .route("/expenses/variable", post(create_variable_expense))
        .route("/expenses/fixed", post(create_fixed_expense))
        .route("/expenses", get(list_expenses))
        .route(
            "/expenses/{expense_id}",
            put(update_expense).delete(delete_expense),
        )
        // ─── Payroll ──────────────────────────────────────────
        .route("/payrolls", post(create_payroll).get(list_payrolls))
        .route("/payrolls/{payroll_id}", get(get_payroll))
        .route("/payrolls/{payroll_id}/pay", patch(mark_payroll_paid))
        // ─── Reports ──────────────────────────────────────────
        .route("/reports/summary", get(financial_summary))
}
