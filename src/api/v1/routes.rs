/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /users, /login, /refresh, /logout は認証なし
 * - POST / (= /api/v1) は bearer + roles {2, 3} を require で適用
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth::require;
use crate::state::AppState;

use crate::api::v1::handlers::{
    auth::{login, logout_from_body, logout_from_cookie, refresh_from_body, refresh_from_cookie},
    home::home,
    users::create_user,
};

pub const HOME_REQUIRED_ROLES: [i32; 2] = [2, 3];

pub fn routes(state: &AppState) -> Router<AppState> {
    let protected = require(
        Router::new().route("/", post(home)),
        state,
        &HOME_REQUIRED_ROLES,
    );

    Router::new()
        .route("/users", post(create_user))
        .route("/login", post(login))
        .route("/refresh", get(refresh_from_cookie).post(refresh_from_body))
        .route("/logout", get(logout_from_cookie).post(logout_from_body))
        .merge(protected)
}
