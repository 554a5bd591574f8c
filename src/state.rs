/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - sessions: credential lifecycle (store + token codec)
 *   - secure_cookies: APP_ENV が dev 以外なら true
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::SessionService;

#[derive(Clone, Debug)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(sessions: Arc<SessionService>, secure_cookies: bool) -> Self {
        Self {
            sessions,
            secure_cookies,
        }
    }
}
