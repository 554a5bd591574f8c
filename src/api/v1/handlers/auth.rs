/*
 * Responsibility
 * - POST /login, GET|POST /refresh, GET|POST /logout
 * - refresh token の受け取り口は cookie (GET) と JSON body (POST) の 2 つ
 *   どちらも同じ SessionService の処理に渡す (違いは取り出し方と cookie の扱いだけ)
 */
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{
    api::v1::{
        cookies::{self, REFRESH_COOKIE_NAME},
        dto::auth::{AccessTokenResponse, LoginRequest, RefreshTokenRequest},
    },
    error::AppError,
    state::AppState,
};

// Audience of minted tokens: where the request came from, if the browser said so.
fn referer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload.map_err(|e| {
        debug!(error = %e, "login body rejected");
        AppError::bad_request("bad login request")
    })?;

    let out = state
        .sessions
        .login(&req.user_name, &req.password, referer(&headers))
        .await?;

    let cookie = cookies::refresh_cookie(&out.refresh_token, state.secure_cookies)?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AccessTokenResponse::new(out.access_token)),
    )
        .into_response())
}

pub async fn refresh_from_cookie(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = cookies::read_cookie(&headers, REFRESH_COOKIE_NAME)
        .ok_or_else(|| AppError::unauthorized("refresh token not found"))?;

    let out = state.sessions.refresh(token, referer(&headers)).await?;

    let mut res = Json(AccessTokenResponse::new(out.access_token)).into_response();
    if let Some(rotated) = out.refresh_token {
        let cookie = cookies::refresh_cookie(&rotated, state.secure_cookies)?;
        res.headers_mut().insert(header::SET_COOKIE, cookie);
    }

    Ok(res)
}

pub async fn refresh_from_body(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let Json(req) = payload.map_err(|e| {
        debug!(error = %e, "refresh body rejected");
        AppError::unauthorized("refresh token not found")
    })?;

    let out = state
        .sessions
        .refresh(&req.refresh_token, referer(&headers))
        .await?;

    Ok(Json(AccessTokenResponse {
        access_token: out.access_token,
        refresh_token: out.refresh_token,
    }))
}

pub async fn logout_from_cookie(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match cookies::read_cookie(&headers, REFRESH_COOKIE_NAME) {
        Some(token) => revoke(&state, token).await,
        // Nothing to revoke.
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn logout_from_body(
    State(state): State<AppState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(req)) => revoke(&state, &req.refresh_token).await,
        Err(e) => {
            debug!(error = %e, "logout body rejected");
            AppError::bad_request("bad logout request").into_response()
        }
    }
}

// The client cookie is cleared on success and when the token is no longer live.
async fn revoke(state: &AppState, token: &str) -> Response {
    let clear = [(
        header::SET_COOKIE,
        cookies::cleared_refresh_cookie(state.secure_cookies),
    )];

    match state.sessions.logout(token).await {
        Ok(()) => (StatusCode::NO_CONTENT, clear).into_response(),
        Err(e @ AppError::Forbidden(_)) => (clear, e).into_response(),
        Err(e) => e.into_response(),
    }
}
