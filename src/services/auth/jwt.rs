use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 60;
pub const REFRESH_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn ttl_seconds(self) -> i64 {
        match self {
            TokenKind::Access => ACCESS_TOKEN_TTL_SECONDS,
            TokenKind::Refresh => REFRESH_TOKEN_TTL_SECONDS,
        }
    }
}

/// Claims carried by both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_name: String,
    pub roles: Vec<i32>,
    pub iss: String,
    #[serde(default)]
    pub aud: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    // Keeps two tokens minted in the same second for the same user distinct.
    #[serde(default)]
    pub jti: Option<String>,
    // Absent on tokens minted before the claim existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<TokenKind>,
}

impl TokenClaims {
    pub fn new(
        kind: TokenKind,
        user_name: impl Into<String>,
        roles: Vec<i32>,
        issuer: impl Into<String>,
        audience: Option<&str>,
    ) -> Self {
        let iat = Utc::now().timestamp();
        Self {
            user_name: user_name.into(),
            roles,
            iss: issuer.into(),
            aud: audience.map(|a| vec![a.to_string()]).unwrap_or_default(),
            iat,
            exp: iat + kind.ttl_seconds(),
            jti: Some(Uuid::new_v4().to_string()),
            typ: Some(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("token claims are invalid: {0}")]
    InvalidClaims(&'static str),
    #[error("failed to sign token")]
    Signing,
}

/// HS256 signer/verifier for access and refresh tokens.
///
/// Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        // Only HS256 is in the allow-list; any other declared `alg` fails decoding.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn mint(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());

        jsonwebtoken::encode(&header, claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign JWT");
            TokenError::Signing
        })
    }

    pub fn parse(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "token verification failed");
                classify(e.kind())
            })?;
        let claims = data.claims;

        let now = Utc::now().timestamp();
        if claims.iat > now {
            return Err(TokenError::InvalidClaims("iat is in the future"));
        }
        if claims.iat > claims.exp {
            return Err(TokenError::InvalidClaims("iat is after exp"));
        }
        if claims.user_name.is_empty() {
            return Err(TokenError::InvalidClaims("user name claims are missing"));
        }

        Ok(claims)
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::MissingRequiredClaim(_) => TokenError::InvalidClaims("required claim is missing"),
        _ => TokenError::Malformed,
    }
}
