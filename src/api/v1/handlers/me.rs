/*
 * Responsibility
 * - GET /me: gate が request に結び付けた Principal をそのまま返す
 */
use axum::Json;

use crate::api::v1::{dto::me::MeResponse, extractors::CurrentPrincipal};

pub async fn me(CurrentPrincipal(principal): CurrentPrincipal) -> Json<MeResponse> {
    Json(principal.into())
}
