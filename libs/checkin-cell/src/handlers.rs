// libs/checkin-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::DashboardQuery;
use crate::services::DashboardService;

#[axum::debug_handler]
pub async fn get_summary(
    State(service): State<Arc<DashboardService>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Value>, AppError> {
    let now = Utc::now();
    let date = service.reference_date(query.date, now);

    let summary = service.summary(date, now).await;

    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn get_slots(
    State(service): State<Arc<DashboardService>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Value>, AppError> {
    let now = Utc::now();
    let date = service.reference_date(query.date, now);

    let slots = service.slots(date, now).await;

    Ok(Json(json!({
        "reference_date": date,
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn get_clients(
    State(service): State<Arc<DashboardService>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Value>, AppError> {
    let now = Utc::now();
    let date = service.reference_date(query.date, now);

    let rows = service.client_rows(date, now).await;

    Ok(Json(json!({
        "reference_date": date,
        "clients": rows,
        "total": rows.len()
    })))
}

#[axum::debug_handler]
pub async fn get_status(
    State(service): State<Arc<DashboardService>>,
) -> Result<Json<Value>, AppError> {
    let report = service.status().await?;

    Ok(Json(json!(report)))
}
