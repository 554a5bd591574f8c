/*
 * Responsibility
 * - POST /users (登録)
 * - Json を extractor で受け、DTO validation → SessionService 呼び出し
 */
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::debug;

use crate::{api::v1::dto::users::CreateUserRequest, error::AppError, state::AppState};

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<i32>), AppError> {
    let Json(req) = payload.map_err(|e| {
        debug!(error = %e, "create user body rejected");
        AppError::bad_request("bad create user request")
    })?;
    req.validate().map_err(AppError::bad_request)?;

    let user_id = state
        .sessions
        .register(&req.user_name, &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user_id)))
}
