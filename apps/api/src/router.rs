use std::sync::Arc;

use axum::{routing::get, Router};

use planning_cell::router::{appointment_routes, planning_routes};
use planning_cell::PlanningState;

pub fn create_router(state: Arc<PlanningState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Hospital planning API is running!" }))
        .nest("/planning", planning_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
}
