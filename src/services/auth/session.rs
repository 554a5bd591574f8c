use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::repos::error::RepoError;
use crate::repos::user_repo::{UserRow, UserStore};
use crate::services::auth::jwt::{TokenClaims, TokenCodec, TokenError, TokenKind};
use crate::services::password;

/// Orchestrates the credential lifecycle over the user store.
///
/// - Access tokens are stateless (60 s).
/// - The refresh token (24 h) is live only while it equals the user's stored `refresh_token`.
/// - Logging in again overwrites, and so invalidates, the previous refresh token.
#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn UserStore>,
    tokens: TokenCodec,
    issuer: String,
    default_roles: Vec<i32>,
    rotate_refresh: bool,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("issuer", &self.issuer)
            .field("default_roles", &self.default_roles)
            .field("rotate_refresh", &self.rotate_refresh)
            .finish()
    }
}

/// Tokens produced by a successful login.
#[derive(Clone, Debug)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a refresh. `refresh_token` is set only when rotation is enabled.
#[derive(Clone, Debug)]
pub struct RefreshedAccess {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: TokenCodec,
        issuer: String,
        default_roles: Vec<i32>,
        rotate_refresh: bool,
    ) -> Self {
        Self {
            users,
            tokens,
            issuer,
            default_roles,
            rotate_refresh,
        }
    }

    /// Hash the password and create the user with the default role set.
    pub async fn register(&self, user_name: &str, password: &str) -> Result<i32, AppError> {
        let plaintext = password.to_string();
        let hash = blocking(move || password::hash_password(&plaintext)).await??;

        let user_id = self
            .users
            .insert(user_name, &hash, &self.default_roles)
            .await?;

        info!(user_id, "user registered");
        Ok(user_id)
    }

    /// Verify credentials, mint an access/refresh pair and bind the refresh token to the user.
    pub async fn login(
        &self,
        user_name: &str,
        password: &str,
        audience: Option<&str>,
    ) -> Result<IssuedTokens, AppError> {
        let user = match self.users.find_by_name(user_name).await {
            Ok(user) => user,
            Err(RepoError::NotFound) => {
                // Same cost as a wrong password.
                let plaintext = password.to_string();
                blocking(move || password::burn_verify(&plaintext)).await?;
                return Err(AppError::bad_request("user not found"));
            }
            Err(e) => return Err(e.into()),
        };

        let plaintext = password.to_string();
        let stored = user.password_hash.clone();
        blocking(move || password::verify_password(&plaintext, &stored)).await??;

        let access_token = self.mint(TokenKind::Access, &user, audience)?;
        let refresh_token = self.mint(TokenKind::Refresh, &user, audience)?;

        self.bind_refresh(user.id, &refresh_token).await?;

        info!(user_id = user.id, "user logged in");
        Ok(IssuedTokens {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a live refresh token for a new access token.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        audience: Option<&str>,
    ) -> Result<RefreshedAccess, AppError> {
        let user = self.live_user(refresh_token).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::unauthorized("user not found"),
            other => other,
        })?;

        let claims = self.tokens.parse(refresh_token)?;
        if claims.user_name != user.user_name {
            warn!(
                user_id = user.id,
                "user name from refresh token does not match the stored user"
            );
            return Err(AppError::unauthorized("unauthorized"));
        }

        let access_token = self.mint(TokenKind::Access, &user, audience)?;

        let refresh_token = if self.rotate_refresh {
            let rotated = self.mint(TokenKind::Refresh, &user, audience)?;
            self.bind_refresh(user.id, &rotated).await?;
            debug!(user_id = user.id, "refresh token rotated");
            Some(rotated)
        } else {
            None
        };

        Ok(RefreshedAccess {
            access_token,
            refresh_token,
        })
    }

    /// Revoke the live refresh token. Presenting a token that is not live is Forbidden.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        let user = self.live_user(refresh_token).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::forbidden("user not found"),
            other => other,
        })?;

        self.bind_refresh(user.id, "").await?;

        info!(user_id = user.id, "user logged out");
        Ok(())
    }

    /// Verify a bearer access token. Refresh tokens and untyped tokens are not bearers.
    pub fn authenticate(&self, token: &str) -> Result<TokenClaims, AppError> {
        let claims = self.tokens.parse(token)?;
        if claims.typ != Some(TokenKind::Access) {
            return Err(TokenError::InvalidClaims("not an access token").into());
        }
        Ok(claims)
    }

    async fn live_user(&self, refresh_token: &str) -> Result<UserRow, AppError> {
        self.users
            .find_by_refresh(refresh_token)
            .await
            .map_err(AppError::from)
    }

    async fn bind_refresh(&self, user_id: i32, refresh_token: &str) -> Result<(), AppError> {
        self.users
            .set_refresh(user_id, refresh_token)
            .await
            .map_err(|e| {
                error!(user_id, error = ?e, "failed to update refresh token");
                AppError::Internal
            })?;
        Ok(())
    }

    fn mint(
        &self,
        kind: TokenKind,
        user: &UserRow,
        audience: Option<&str>,
    ) -> Result<String, AppError> {
        let claims = TokenClaims::new(
            kind,
            user.user_name.as_str(),
            user.roles.clone(),
            self.issuer.as_str(),
            audience,
        );
        Ok(self.tokens.mint(&claims)?)
    }
}

// Hashing is CPU-bound; keep it off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!(error = %e, "blocking task failed");
        AppError::Internal
    })
}
