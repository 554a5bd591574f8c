/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth::require(...) は保護ルートに、それ以外は Router 全体に適用する
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
