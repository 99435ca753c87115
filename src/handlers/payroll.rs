// src/handlers/payroll.rs

use crate::{
    errors::{AppError, AppResult},
    handlers::reports::REPORTS_CACHE_PREFIX,
    models::{
        CreatePayrollRequest, MarkPayrollPaidRequest, Payroll, PayrollListParams, PayrollStatus,
    },
    services::settlement::SettlementService,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

/// Create a payroll entry for a driver and period.
/// Amounts are entered manually; an uploaded payslip is referenced by URL
/// only, its contents are never parsed.
#[utoipa::path(
    post,
    path = "/api/v1/payrolls",
    request_body = CreatePayrollRequest,
    responses(
        (status = 201, description = "Payroll created", body = Payroll),
        (status = 400, description = "Invalid amounts or period"),
    ),
    tag = "Payroll"
)]
pub async fn create_payroll(
    State(state): State<AppState>,
    Json(body): Json<CreatePayrollRequest>,
) -> AppResult<(StatusCode, Json<Payroll>)> {
    if body.period_start > body.period_end {
        return Err(AppError::Validation(format!(
            "period_start ({}) must be before or equal to period_end ({})",
            body.period_start, body.period_end
        )));
    }
    for (field, value) in [
        ("base_salary", body.base_salary),
        ("commissions", body.commissions),
        ("bonuses", body.bonuses),
        ("deductions", body.deductions),
        ("tax_withholding", body.tax_withholding),
    ] {
        SettlementService::ensure_non_negative(field, value)?;
    }

    let net_amount = SettlementService::payroll_net(
        body.base_salary,
        body.commissions,
        body.bonuses,
        body.deductions,
        body.tax_withholding,
    );

    let payroll = sqlx::query_as::<_, Payroll>(
        r#"INSERT INTO payrolls (
            id, driver_id, period_start, period_end,
            base_salary, commissions, bonuses, deductions, tax_withholding, net_amount,
            status, payment_date, pdf_url, notes, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,'pending',NULL,$11,$12,NOW(),NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.driver_id)
    .bind(body.period_start)
    .bind(body.period_end)
    .bind(body.base_salary)
    .bind(body.commissions)
    .bind(body.bonuses)
    .bind(body.deductions)
    .bind(body.tax_withholding)
    .bind(net_amount)
    .bind(body.pdf_url)
    .bind(body.notes)
    .fetch_one(&state.db)
    .await?;

    state.cache.invalidate_prefix(REPORTS_CACHE_PREFIX).await;
    Ok((StatusCode::CREATED, Json(payroll)))
}

/// List payroll entries, optionally for one driver
#[utoipa::path(
    get,
    path = "/api/v1/payrolls",
    params(PayrollListParams),
    responses((status = 200, description = "Payroll entries", body = Vec<Payroll>)),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    State(state): State<AppState>,
    Query(params): Query<PayrollListParams>,
) -> AppResult<Json<Vec<Payroll>>> {
    let payrolls = sqlx::query_as::<_, Payroll>(
        r#"SELECT * FROM payrolls
           WHERE ($1::uuid IS NULL OR driver_id = $1)
           ORDER BY period_start DESC"#,
    )
    .bind(params.driver_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(payrolls))
}

/// Get a single payroll entry
#[utoipa::path(
    get,
    path = "/api/v1/payrolls/{payroll_id}",
    params(("payroll_id" = Uuid, Path, description = "Payroll ID")),
    responses(
        (status = 200, description = "Payroll detail", body = Payroll),
        (status = 404, description = "Payroll not found"),
    ),
    tag = "Payroll"
)]
pub async fn get_payroll(
    State(state): State<AppState>,
    Path(payroll_id): Path<Uuid>,
) -> AppResult<Json<Payroll>> {
    let payroll = sqlx::query_as::<_, Payroll>("SELECT * FROM payrolls WHERE id = $1")
        .bind(payroll_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payroll {} not found", payroll_id)))?;

    Ok(Json(payroll))
}

/// Mark a payroll entry as paid
#[utoipa::path(
    patch,
    path = "/api/v1/payrolls/{payroll_id}/pay",
    request_body = MarkPayrollPaidRequest,
    responses(
        (status = 200, description = "Payroll marked paid", body = Payroll),
        (status = 404, description = "Payroll not found"),
        (status = 409, description = "Payroll already paid"),
    ),
    params(("payroll_id" = Uuid, Path, description = "Payroll ID")),
    tag = "Payroll"
)]
pub async fn mark_payroll_paid(
    State(state): State<AppState>,
    Path(payroll_id): Path<Uuid>,
    Json(body): Json<MarkPayrollPaidRequest>,
) -> AppResult<Json<Payroll>> {
    let existing = sqlx::query_as::<_, Payroll>("SELECT * FROM payrolls WHERE id = $1")
        .bind(payroll_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payroll {} not found", payroll_id)))?;

    if existing.status == PayrollStatus::Paid {
        return Err(AppError::Conflict(format!(
            "Payroll {} is already marked as paid",
            payroll_id
        )));
    }

    let payment_date = body
        .payment_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let payroll = sqlx::query_as::<_, Payroll>(
        r#"UPDATE payrolls
           SET status = 'paid', payment_date = $1, updated_at = NOW()
           WHERE id = $2
           RETURNING *"#,
    )
    .bind(payment_date)
    .bind(payroll_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(payroll))
}
