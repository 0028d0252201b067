/// Refresh Token Rotation
///
/// Exchanges a presented refresh token for a new token pair. A chain of
/// rotations forms a family owned by one user; presenting a token that was
/// already revoked is treated as theft and locks the whole family out.
///
/// Per-record states: `Active` -> `Revoked` (terminal). `Expired` is derived
/// from the clock and never triggers reuse detection.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::jwt::TokenCodec;
use crate::auth::refresh_token::{NewRefreshToken, TokenState};
use crate::error::AuthError;
use crate::store::RefreshTokenStore;

/// Access and refresh token handed back to the client
#[derive(Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

pub struct RotationEngine<S> {
    store: Arc<S>,
    codec: TokenCodec,
    refresh_token_expiry: i64,
}

impl<S: RefreshTokenStore> RotationEngine<S> {
    pub fn new(store: Arc<S>, codec: TokenCodec, refresh_token_expiry: i64) -> Self {
        Self {
            store,
            codec,
            refresh_token_expiry,
        }
    }

    /// Start a new chain for `user_id` (login, registration)
    pub async fn issue(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        let access_token = self.codec.issue_access_token(&user_id)?;
        let refresh = NewRefreshToken::generate(user_id, self.refresh_token_expiry);
        self.store.insert(&refresh).await?;

        Ok(self.pair(access_token, refresh.token))
    }

    /// Exchange `presented` for a new pair, revoking it.
    ///
    /// Every failure is `InvalidToken`; whether reuse was detected is only
    /// visible in the logs.
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, AuthError> {
        let record = match self.store.find_by_value(presented).await? {
            Some(record) => record,
            None => {
                tracing::warn!("Refresh token not found");
                return Err(AuthError::InvalidToken);
            }
        };
        let user_id = record.user_id;

        match record.state(Utc::now()) {
            TokenState::Revoked => {
                self.reuse_detected(user_id).await?;
                return Err(AuthError::InvalidToken);
            }
            TokenState::Expired => {
                tracing::info!(user_id = %user_id, "Refresh token expired");
                return Err(AuthError::InvalidToken);
            }
            TokenState::Active => {}
        }

        let access_token = self.codec.issue_access_token(&user_id)?;
        let replacement = NewRefreshToken::generate(user_id, self.refresh_token_expiry);

        if self.store.rotate(presented, &replacement).await?.is_none() {
            // Lost a race: another rotation revoked it, or it expired since the lookup
            let revoked = self
                .store
                .find_by_value(presented)
                .await?
                .map(|r| r.state(Utc::now()) == TokenState::Revoked)
                .unwrap_or(false);
            if revoked {
                self.reuse_detected(user_id).await?;
            }
            return Err(AuthError::InvalidToken);
        }

        tracing::info!(user_id = %user_id, "Refresh token rotated");
        Ok(self.pair(access_token, replacement.token))
    }

    /// Revoke a single refresh token (logout). Unknown values are ignored.
    pub async fn revoke(&self, presented: &str) -> Result<(), AuthError> {
        self.store.revoke(presented).await?;
        Ok(())
    }

    /// Revoke every refresh token of `user_id` (logout everywhere)
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let revoked = self.store.revoke_all_for_user(user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "All refresh tokens revoked for user");
        Ok(revoked)
    }

    async fn reuse_detected(&self, user_id: Uuid) -> Result<(), AuthError> {
        tracing::warn!(user_id = %user_id, "Revoked refresh token presented, revoking token family");
        self.revoke_all(user_id).await?;
        Ok(())
    }

    fn pair(&self, access_token: String, refresh_token: String) -> TokenPair {
        TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.codec.access_token_expiry(),
        }
    }
}
