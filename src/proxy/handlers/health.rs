use axum::Json;
use serde_json::{json, Value};

use crate::config::VERSION;

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": VERSION,
    }))
}
