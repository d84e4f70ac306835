//! Rider API 模块
//!
//! `/api/rider/*` acts on the calling rider; `/api/riders/{user_id}/status`
//! lets delivery managers set another rider's status.

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/api/rider", routes())
        .route("/api/riders/{user_id}/status", put(handler::update_rider_status))
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/dashboard", get(handler::dashboard))
        .route("/orders", get(handler::orders))
        .route("/status", put(handler::update_status))
        .route("/location", put(handler::update_location))
}
