use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use checkin_cell::{create_checkin_router, DashboardService};

pub fn create_router(service: Arc<DashboardService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Food bank dashboard API is running!" }))
        .nest("/dashboard", create_checkin_router(service))
}
