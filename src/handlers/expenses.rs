// src/handlers/expenses.rs

use crate::{
    errors::{AppError, AppResult},
    handlers::reports::REPORTS_CACHE_PREFIX,
    models::{
        CreateFixedExpenseRequest, CreateVariableExpenseRequest, Expense, ExpenseListParams,
        UpdateExpenseRequest,
    },
    services::settlement::SettlementService,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Register a one-off expense from its VAT-inclusive total.
/// The pre-tax base and the 21% IVA portion are derived server-side.
#[utoipa::path(
    post,
    path = "/api/v1/expenses/variable",
    request_body = CreateVariableExpenseRequest,
    responses(
        (status = 201, description = "Expense created", body = Expense),
        (status = 400, description = "Invalid amount"),
    ),
    tag = "Expenses"
)]
pub async fn create_variable_expense(
    State(state): State<AppState>,
    Json(body): Json<CreateVariableExpenseRequest>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    let (amount, tax_amount) = SettlementService::split_total_with_vat(body.total_amount)?;

    let expense = sqlx::query_as::<_, Expense>(
        r#"INSERT INTO expenses (
            id, date, category, description, amount, tax_amount, total_amount,
            is_recurring, frequency, next_due_date, status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,false,NULL,NULL,'pending',NOW(),NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.date)
    .bind(body.category)
    .bind(body.description)
    .bind(amount)
    .bind(tax_amount)
    .bind(body.total_amount)
    .fetch_one(&state.db)
    .await?;

    state.cache.invalidate_prefix(REPORTS_CACHE_PREFIX).await;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// Register a fixed monthly charge and its recurrence schedule
#[utoipa::path(
    post,
    path = "/api/v1/expenses/fixed",
    request_body = CreateFixedExpenseRequest,
    responses(
        (status = 201, description = "Expense created", body = Expense),
        (status = 400, description = "Invalid amount"),
    ),
    tag = "Expenses"
)]
pub async fn create_fixed_expense(
    State(state): State<AppState>,
    Json(body): Json<CreateFixedExpenseRequest>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    SettlementService::ensure_non_negative("amount", body.amount)?;

    let expense = sqlx::query_as::<_, Expense>(
        r#"INSERT INTO expenses (
            id, date, category, description, amount, tax_amount, total_amount,
            is_recurring, frequency, next_due_date, status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,0,$5,true,$6,$7,'pending',NOW(),NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.date)
    .bind(body.category)
    .bind(body.description)
    .bind(body.amount)
    .bind(body.frequency)
    .bind(body.next_due_date)
    .fetch_one(&state.db)
    .await?;

    state.cache.invalidate_prefix(REPORTS_CACHE_PREFIX).await;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// List expenses for a date range, optionally only fixed or only variable
#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    params(ExpenseListParams),
    responses(
        (status = 200, description = "Expenses in range", body = Vec<Expense>),
        (status = 400, description = "Invalid date range"),
    ),
    tag = "Expenses"
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    Query(params): Query<ExpenseListParams>,
) -> AppResult<Json<Vec<Expense>>> {
    if params.start_date > params.end_date {
        return Err(AppError::Validation(format!(
            "start_date ({}) must be before or equal to end_date ({})",
            params.start_date, params.end_date
        )));
    }

    let expenses = sqlx::query_as::<_, Expense>(
        r#"SELECT * FROM expenses
           WHERE date >= $1 AND date <= $2
             AND ($3::bool IS NULL OR is_recurring = $3)
           ORDER BY date DESC, created_at DESC"#,
    )
    .bind(params.start_date)
    .bind(params.end_date)
    .bind(params.recurring)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(expenses))
}

/// Edit an expense line.
/// Variable entries re-derive the VAT split from a new total; fixed entries
/// take a new pre-tax amount and must keep their recurrence schedule intact.
#[utoipa::path(
    put,
    path = "/api/v1/expenses/{expense_id}",
    request_body = UpdateExpenseRequest,
    params(("expense_id" = Uuid, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense updated", body = Expense),
        (status = 400, description = "Invalid change"),
        (status = 404, description = "Expense not found"),
    ),
    tag = "Expenses"
)]
pub async fn update_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
    Json(body): Json<UpdateExpenseRequest>,
) -> AppResult<Json<Expense>> {
    let existing = sqlx::query_as::<_, Expense>("SELECT * FROM expenses WHERE id = $1")
        .bind(expense_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Expense {} not found", expense_id)))?;

    let (amount, tax_amount, total_amount) = if existing.is_recurring {
        let amount = body.amount.unwrap_or(existing.amount);
        SettlementService::ensure_non_negative("amount", amount)?;
        (amount, Decimal::ZERO, amount)
    } else {
        match body.total_amount {
            Some(total) => {
                let (amount, tax) = SettlementService::split_total_with_vat(total)?;
                (amount, tax, total)
            }
            None => (existing.amount, existing.tax_amount, existing.total_amount),
        }
    };

    let frequency = body.frequency.or(existing.frequency);
    let next_due_date = body.next_due_date.or(existing.next_due_date);
    if existing.is_recurring && (frequency.is_none() || next_due_date.is_none()) {
        return Err(AppError::Validation(
            "Recurring expenses must keep a frequency and next due date".to_string(),
        ));
    }

    let status = body.status.unwrap_or(existing.status);
    let expense = sqlx::query_as::<_, Expense>(
        r#"UPDATE expenses SET
            category = $1, description = $2,
            amount = $3, tax_amount = $4, total_amount = $5,
            frequency = $6, next_due_date = $7, status = $8,
            updated_at = NOW()
           WHERE id = $9
           RETURNING *"#,
    )
    .bind(body.category.unwrap_or(existing.category))
    .bind(body.description.unwrap_or(existing.description))
    .bind(amount)
    .bind(tax_amount)
    .bind(total_amount)
    .bind(frequency)
    .bind(next_due_date)
    .bind(status)
    .bind(expense_id)
    .fetch_one(&state.db)
    .await?;

    state.cache.invalidate_prefix(REPORTS_CACHE_PREFIX).await;
    Ok(Json(expense))
}

/// Delete an expense line
#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{expense_id}",
    params(("expense_id" = Uuid, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense deleted"),
        (status = 404, description = "Expense not found"),
    ),
    tag = "Expenses"
)]
pub async fn delete_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
        .bind(expense_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Expense {} not found",
            expense_id
        )));
    }

    state.cache.invalidate_prefix(REPORTS_CACHE_PREFIX).await;
    Ok(Json(serde_json::json!({ "message": "Expense deleted successfully" })))
}
