//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppResult, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
}

#[derive(Serialize)]
pub struct DbHealthResponse {
    ok: bool,
}

pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

/// Round-trips to the database.
pub async fn db(State(state): State<AppState>) -> AppResult<Json<DbHealthResponse>> {
    state.store.ping().await?;
    Ok(Json(DbHealthResponse { ok: true }))
}
