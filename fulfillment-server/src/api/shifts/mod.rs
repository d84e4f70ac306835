//! Shift API 模块 (班次管理)

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/shifts", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .route("/start", post(handler::start))
        .route("/current", get(handler::get_current))
        .route("/end", post(handler::end))
        .route("/{id}/report", get(handler::report))
}
