use serde::{Deserialize, Serialize};

/// Request body for `POST /login`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

/// Request body for `POST /refresh` and `POST /logout`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    /// Present only on the body refresh channel when rotation is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AccessTokenResponse {
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            refresh_token: None,
        }
    }
}
