use axum::Json;
use serde::Serialize;

use crate::api::v1::extractors::AuthCtxExtractor;

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub name: &'static str,
    pub version: &'static str,
}

/// POST /api/v1, behind `require([2, 3])`.
pub async fn home(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<HomeResponse> {
    tracing::debug!(user_name = %ctx.user_name, roles = ?ctx.roles, jti = ?ctx.jti, "protected resource accessed");

    Json(HomeResponse {
        name: "Go auth",
        version: "1.0",
    })
}
