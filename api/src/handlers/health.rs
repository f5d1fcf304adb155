use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{error::AppError, AppState};

// GET /api/health
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    sqlx::query("SELECT 1").execute(&state.db).await?;
    Ok(Json(json!({ "status": "ok" })))
}
