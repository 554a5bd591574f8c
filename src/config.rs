/*
 * Responsibility
 * - 環境変数の読み込み (DATABASE_URL, JWT_SECRET, SERVER_IP, APP_ENV, FRONTEND_ORIGIN など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::services::auth::roles::parse_role_list;

pub const DEV_FRONTEND_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    /// Only an explicit `dev` turns off production behaviour (Secure cookies, CORS origin).
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("dev") | Some("development") => Self::Development,
            _ => Self::Production,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Development)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub store_timeout: Duration,

    pub app_env: AppEnv,
    pub frontend_origin: String,

    // Token issuer (`iss`)
    pub server_ip: String,
    pub jwt_secret: String,

    pub default_roles: Vec<i32>,
    pub rotate_refresh_tokens: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print secrets or credentials embedded in the database URL
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("frontend_origin", &self.frontend_origin)
            .field("server_ip", &self.server_ip)
            .field("store_timeout", &self.store_timeout)
            .field("default_roles", &self.default_roles)
            .field("rotate_refresh_tokens", &self.rotate_refresh_tokens)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 8080,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let database_max_connections = get("DATABASE_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(10);

        let store_timeout = get("STORE_TIMEOUT_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3));

        let app_env = AppEnv::parse(get("APP_ENV").as_deref());

        let frontend_origin = match get("FRONTEND_ORIGIN") {
            Some(origin) => origin.trim().trim_end_matches('/').to_string(),
            None if app_env.is_dev() => DEV_FRONTEND_ORIGIN.to_string(),
            None => return Err(ConfigError::Missing("FRONTEND_ORIGIN")),
        };
        let parsed =
            url::Url::parse(&frontend_origin).map_err(|_| ConfigError::Invalid("FRONTEND_ORIGIN"))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ConfigError::Invalid("FRONTEND_ORIGIN"));
        }

        let server_ip = get("SERVER_IP").ok_or(ConfigError::Missing("SERVER_IP"))?;

        let jwt_secret = get("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let default_roles = match get("DEFAULT_ROLES") {
            Some(raw) => parse_role_list(&raw).ok_or(ConfigError::Invalid("DEFAULT_ROLES"))?,
            None => vec![2, 1, 3, 4],
        };

        let rotate_refresh_tokens = get("ROTATE_REFRESH_TOKENS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            addr,
            database_url,
            database_max_connections,
            store_timeout,
            app_env,
            frontend_origin,
            server_ip,
            jwt_secret,
            default_roles,
            rotate_refresh_tokens,
        })
    }
}
