/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が検証して request extensions に格納し、handler はこの型だけを受け取る
 */

/// Context attached to a request whose bearer token passed verification and role admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCtx {
    pub user_name: String,
    pub roles: Vec<i32>,
    pub jti: Option<String>,
}

impl AuthCtx {
    pub fn new(user_name: String, roles: Vec<i32>, jti: Option<String>) -> Self {
        Self {
            user_name,
            roles,
            jti,
        }
    }
}
