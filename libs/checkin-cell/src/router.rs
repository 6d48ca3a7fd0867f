// libs/checkin-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::services::DashboardService;

pub fn create_checkin_router(service: Arc<DashboardService>) -> Router {
    Router::new()
        .route("/summary", get(handlers::get_summary))
        .route("/slots", get(handlers::get_slots))
        .route("/clients", get(handlers::get_clients))
        .route("/status", get(handlers::get_status))
        .with_state(service)
}
