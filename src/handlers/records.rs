// src/handlers/records.rs

use crate::{
    errors::{AppError, AppResult},
    handlers::reports::REPORTS_CACHE_PREFIX,
    models::{CreateDailyRecordRequest, DailyRecord, RecordListParams, UpdateDailyRecordRequest},
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

/// Append the supersede marker to a record's notes on update.
fn mark_updated(notes: Option<String>, stamp: &str) -> String {
    match notes {
        Some(n) if !n.trim().is_empty() => format!("{n} | Actualizado: {stamp}"),
        _ => format!("Actualizado: {stamp}"),
    }
}

/// Register a driver's daily shift record
#[utoipa::path(
    post,
    path = "/api/v1/records",
    request_body = CreateDailyRecordRequest,
    responses(
        (status = 201, description = "Record created", body = DailyRecord),
        (status = 400, description = "Invalid shift figures"),
    ),
    tag = "Daily Records"
)]
pub async fn create_record(
    State(state): State<AppState>,
    Json(body): Json<CreateDailyRecordRequest>,
) -> AppResult<(StatusCode, Json<DailyRecord>)> {
    let total_km = SettlementService::validate_odometer(body.start_km, body.end_km)?;
    for (field, value) in [
        ("cash_amount", body.cash_amount),
        ("card_amount", body.card_amount),
        ("invoice_amount", body.invoice_amount),
        ("other_amount", body.other_amount),
        ("fuel_expense", body.fuel_expense),
        ("other_expenses", body.other_expenses),
    ] {
        SettlementService::ensure_non_negative(field, value)?;
    }

    let total_amount =
        body.cash_amount + body.card_amount + body.invoice_amount + body.other_amount;
    let policy = body
        .commission_policy
        .unwrap_or(state.config.driver_commission_policy);
    let rate = body
        .commission_rate
        .unwrap_or(state.config.driver_commission_rate);
    let settlement = SettlementService::compute_daily_commission(
        total_amount,
        body.fuel_expense,
        body.other_expenses,
        rate,
        policy,
    )?;

    let record = sqlx::query_as::<_, DailyRecord>(
        r#"INSERT INTO daily_records (
            id, driver_id, date, start_km, end_km, total_km,
            cash_amount, card_amount, invoice_amount, other_amount, total_amount,
            fuel_expense, other_expenses,
            commission_policy, commission_rate, driver_commission, net_amount,
            notes, shift_start, shift_end, shift_break, image_url,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,NOW(),NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.driver_id)
    .bind(body.date)
    .bind(body.start_km)
    .bind(body.end_km)
    .bind(total_km)
    .bind(body.cash_amount)
    .bind(body.card_amount)
    .bind(body.invoice_amount)
    .bind(body.other_amount)
    .bind(total_amount)
    .bind(body.fuel_expense)
    .bind(body.other_expenses)
    .bind(policy)
    .bind(rate)
    .bind(settlement.driver_commission)
    .bind(settlement.net_amount)
    .bind(body.notes)
    .bind(body.shift_start)
    .bind(body.shift_end)
    .bind(body.shift_break)
    .bind(body.image_url)
    .fetch_one(&state.db)
    .await?;

    state.cache.invalidate_prefix(REPORTS_CACHE_PREFIX).await;
    Ok((StatusCode::CREATED, Json(record)))
}

/// List daily records for a date range, optionally for one driver
#[utoipa::path(
    get,
    path = "/api/v1/records",
    params(RecordListParams),
    responses(
        (status = 200, description = "Records in range", body = Vec<DailyRecord>),
        (status = 400, description = "Invalid date range"),
    ),
    tag = "Daily Records"
)]
pub async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<RecordListParams>,
) -> AppResult<Json<Vec<DailyRecord>>> {
    if params.start_date > params.end_date {
        return Err(AppError::Validation(format!(
            "start_date ({}) must be before or equal to end_date ({})",
            params.start_date, params.end_date
        )));
    }

    let records = sqlx::query_as::<_, DailyRecord>(
        r#"SELECT * FROM daily_records
           WHERE date >= $1 AND date <= $2
             AND ($3::uuid IS NULL OR driver_id = $3)
           ORDER BY date DESC, created_at DESC"#,
    )
    .bind(params.start_date)
    .bind(params.end_date)
    .bind(params.driver_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(records))
}

/// Get a single daily record
#[utoipa::path(
    get,
    path = "/api/v1/records/{record_id}",
    params(("record_id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record detail", body = DailyRecord),
        (status = 404, description = "Record not found"),
    ),
    tag = "Daily Records"
)]
pub async fn get_record(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> AppResult<Json<DailyRecord>> {
    let record = sqlx::query_as::<_, DailyRecord>("SELECT * FROM daily_records WHERE id = $1")
        .bind(record_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Daily record {} not found", record_id)))?;

    Ok(Json(record))
}

/// Correct a daily record.
/// Derived figures are recomputed and the supersede marker is appended to the
/// record's notes.
#[utoipa::path(
    put,
    path = "/api/v1/records/{record_id}",
    request_body = UpdateDailyRecordRequest,
    params(("record_id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record updated", body = DailyRecord),
        (status = 400, description = "Invalid shift figures"),
        (status = 404, description = "Record not found"),
    ),
    tag = "Daily Records"
)]
pub async fn update_record(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Json(body): Json<UpdateDailyRecordRequest>,
) -> AppResult<Json<DailyRecord>> {
    let existing = sqlx::query_as::<_, DailyRecord>("SELECT * FROM daily_records WHERE id = $1")
        .bind(record_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Daily record {} not found", record_id)))?;

    let start_km = body.start_km.unwrap_or(existing.start_km);
    let end_km = body.end_km.unwrap_or(existing.end_km);
    let total_km = SettlementService::validate_odometer(start_km, end_km)?;

    let cash_amount = body.cash_amount.unwrap_or(existing.cash_amount);
    let card_amount = body.card_amount.unwrap_or(existing.card_amount);
    let invoice_amount = body.invoice_amount.unwrap_or(existing.invoice_amount);
    let other_amount = body.other_amount.unwrap_or(existing.other_amount);
    let fuel_expense = body.fuel_expense.unwrap_or(existing.fuel_expense);
    let other_expenses = body.other_expenses.unwrap_or(existing.other_expenses);
    for (field, value) in [
        ("cash_amount", cash_amount),
        ("card_amount", card_amount),
        ("invoice_amount", invoice_amount),
        ("other_amount", other_amount),
        ("fuel_expense", fuel_expense),
        ("other_expenses", other_expenses),
    ] {
        SettlementService::ensure_non_negative(field, value)?;
    }

    let total_amount = cash_amount + card_amount + invoice_amount + other_amount;
    let policy = body.commission_policy.unwrap_or(existing.commission_policy);
    let rate = body.commission_rate.unwrap_or(existing.commission_rate);
    let settlement = SettlementService::compute_daily_commission(
        total_amount,
        fuel_expense,
        other_expenses,
        rate,
        policy,
    )?;

    let stamp = Utc::now().format("%Y-%m-%d %H:%M").to_string();
    let notes = mark_updated(body.notes.or(existing.notes), &stamp);

    let record = sqlx::query_as::<_, DailyRecord>(
        r#"UPDATE daily_records SET
            start_km = $1, end_km = $2, total_km = $3,
            cash_amount = $4, card_amount = $5, invoice_amount = $6, other_amount = $7,
            total_amount = $8, fuel_expense = $9, other_expenses = $10,
            commission_policy = $11, commission_rate = $12,
            driver_commission = $13, net_amount = $14,
            notes = $15, shift_start = $16, shift_end = $17, shift_break = $18,
            image_url = $19, updated_at = NOW()
           WHERE id = $20
           RETURNING *"#,
    )
    .bind(start_km)
    .bind(end_km)
    .bind(total_km)
    .bind(cash_amount)
    .bind(card_amount)
    .bind(invoice_amount)
    .bind(other_amount)
    .bind(total_amount)
    .bind(fuel_expense)
    .bind(other_expenses)
    .bind(policy)
    .bind(rate)
    .bind(settlement.driver_commission)
    .bind(settlement.net_amount)
    .bind(notes)
    .bind(body.shift_start.or(existing.shift_start))
    .bind(body.shift_end.or(existing.shift_end))
    .bind(body.shift_break.or(existing.shift_break))
    .bind(body.image_url.or(existing.image_url))
    .bind(record_id)
    .fetch_one(&state.db)
    .await?;

    state.cache.invalidate_prefix(REPORTS_CACHE_PREFIX).await;
    Ok(Json(record))
}

/// Delete a daily record
#[utoipa::path(
    delete,
    path = "/api/v1/records/{record_id}",
    params(("record_id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record deleted"),
        (status = 404, description = "Record not found"),
    ),
    tag = "Daily Records"
)]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM daily_records WHERE id = $1")
        .bind(record_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Daily record {} not found",
            record_id
        )));
    }

    state.cache.invalidate_prefix(REPORTS_CACHE_PREFIX).await;
    Ok(Json(serde_json::json!({ "message": "Record deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::mark_updated;

    #[test]
    fn update_marker_appends_to_existing_notes() {
        assert_eq!(
            mark_updated(Some("turno de tarde".to_string()), "2024-03-01 18:30"),
            "turno de tarde | Actualizado: 2024-03-01 18:30"
        );
    }

    #[test]
    fn update_marker_stands_alone_without_notes() {
        assert_eq!(mark_updated(None, "2024-03-01 18:30"), "Actualizado: 2024-03-01 18:30");
        assert_eq!(
            mark_updated(Some("   ".to_string()), "2024-03-01 18:30"),
            "Actualizado: 2024-03-01 18:30"
        );
    }
}
