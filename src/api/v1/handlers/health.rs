/*
 * Responsibility
 * - GET /health (疎通用)
 * - 公開ルートは無いので、これも access gate の内側 (token 必須)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
