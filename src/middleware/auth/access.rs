//! Bearer access token verification + role admission for protected routes.
//!
//! `require(router, state, &[2, 3])` wraps every route of `router`:
//! 1. `Authorization: <scheme> <token>` (two whitespace-separated parts), else 401
//! 2. token signature/claims verification, else 401 with the parser's reason
//! 3. role admission against the required set, else 403
//! 4. `AuthCtx` is inserted into request extensions for the handler

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::{SessionService, roles};
use crate::state::AppState;

#[derive(Clone)]
struct RoleGuard {
    sessions: Arc<SessionService>,
    required: Arc<[i32]>,
}

/// Apply bearer authentication and role admission to all routes in `router`.
///
/// Uses `route_layer` so unmatched paths still fall through to 404 instead of 401.
pub fn require(
    router: Router<AppState>,
    state: &AppState,
    required_roles: &[i32],
) -> Router<AppState> {
    let guard = RoleGuard {
        sessions: state.sessions.clone(),
        required: required_roles.into(),
    };
    router.route_layer(middleware::from_fn_with_state(guard, access_middleware))
}

async fn access_middleware(
    State(guard): State<RoleGuard>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .map(str::to_owned)
        .ok_or_else(|| AppError::unauthorized("token with incorrect bearer format"))?;

    let claims = match guard.sessions.authenticate(&token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(error = %err, "access token verification failed");
            return Err(err);
        }
    };

    if let Err(err) = roles::admit(&claims.roles, &guard.required) {
        tracing::warn!(
            user_name = %claims.user_name,
            required = ?guard.required,
            "role admission denied"
        );
        return Err(AppError::forbidden(err.to_string()));
    }

    // middleware → extractor への受け渡し
    req.extensions_mut()
        .insert(AuthCtx::new(claims.user_name, claims.roles, claims.jti));

    Ok(next.run(req).await)
}

/// Second whitespace-separated part of the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (_, token) = raw.trim_start().split_once(char::is_whitespace)?;
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
