// src/handlers/reports.rs

use crate::{
    errors::{AppError, AppResult},
    models::{DailyRecord, Expense, FinancialSummaryResponse, SummaryParams},
    services::{cache::CacheKey, settlement::SettlementService},
    state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Mutating handlers invalidate everything under this path.
pub const REPORTS_CACHE_PREFIX: &str = "/api/v1/reports";

const SUMMARY_PATH: &str = "/api/v1/reports/summary";

/// Financial settlement summary for a period.
///
/// Pulls the period's records, expenses and base salary, runs the settlement
/// calculation and classifies the margin. Responses are cached; identical
/// concurrent requests share one computation.
#[utoipa::path(
    get,
    path = "/api/v1/reports/summary",
    params(SummaryParams),
    responses(
        (status = 200, description = "Settlement summary for the period", body = FinancialSummaryResponse),
        (status = 400, description = "Invalid date range"),
    ),
    tag = "Reports"
)]
pub async fn financial_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> AppResult<Json<serde_json::Value>> {
    if params.start_date > params.end_date {
        return Err(AppError::Validation(format!(
            "start_date ({}) must be before or equal to end_date ({})",
            params.start_date, params.end_date
        )));
    }

    let key = CacheKey::new(
        "GET",
        SUMMARY_PATH,
        format!(
            "{}..{}|{}",
            params.start_date,
            params.end_date,
            params
                .driver_id
                .map(|id| id.to_string())
                .unwrap_or_default()
        ),
    );

    let db = state.db.clone();
    let config = Arc::clone(&state.config);
    let value = state
        .cache
        .get_or_fetch(key, move || async move {
            let records = sqlx::query_as::<_, DailyRecord>(
                r#"SELECT * FROM daily_records
                   WHERE date >= $1 AND date <= $2
                     AND ($3::uuid IS NULL OR driver_id = $3)
                   ORDER BY date"#,
            )
            .bind(params.start_date)
            .bind(params.end_date)
            .bind(params.driver_id)
            .fetch_all(&db)
            .await?;

            let expenses = sqlx::query_as::<_, Expense>(
                "SELECT * FROM expenses WHERE date >= $1 AND date <= $2",
            )
            .bind(params.start_date)
            .bind(params.end_date)
            .fetch_all(&db)
            .await?;

            let base_salary = resolve_base_salary(
                &db,
                params.driver_id,
                params.start_date,
                params.end_date,
                config.driver_base_salary,
            )
            .await?;

            let summary = SettlementService::aggregate_period(&records, &expenses, base_salary);
            let margin =
                SettlementService::classify_margin(summary.total_income, summary.real_net_profit);

            info!(
                start = %params.start_date,
                end = %params.end_date,
                records = records.len(),
                expenses = expenses.len(),
                net_profit = %summary.real_net_profit,
                "settlement summary generated"
            );

            let response = FinancialSummaryResponse {
                period_start: params.start_date,
                period_end: params.end_date,
                driver_id: params.driver_id,
                base_salary,
                summary,
                margin,
            };
            serde_json::to_value(&response).map_err(|e| AppError::Internal(e.to_string()))
        })
        .await?;

    Ok(Json(value))
}

/// The base salary a driver's commission is reconciled against: the payroll
/// row overlapping the period when one exists, the configured default
/// otherwise (also when no driver filter is given).
async fn resolve_base_salary(
    db: &PgPool,
    driver_id: Option<Uuid>,
    period_start: NaiveDate,
    period_end: NaiveDate,
    default: Decimal,
) -> AppResult<Decimal> {
    let Some(driver_id) = driver_id else {
        return Ok(default);
    };

    let row: Option<(Decimal,)> = sqlx::query_as(
        r#"SELECT base_salary FROM payrolls
           WHERE driver_id = $1 AND period_start <= $2 AND period_end >= $3
           ORDER BY period_start DESC
           LIMIT 1"#,
    )
    .bind(driver_id)
    .bind(period_end)
    .bind(period_start)
    .fetch_optional(db)
    .await?;

    Ok(row.map(|(salary,)| salary).unwrap_or(default))
}
