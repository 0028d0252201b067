/// Credential and Recovery Service
///
/// Registration, login, refresh, logout, forgot-password and reset-password
/// flows, composed from the token codec, the credential verifier, the
/// rotation engine and a store.
///
/// # Security Notes
/// - Unknown email and wrong password produce the same `InvalidCredentials`
///   after the same amount of bcrypt work
/// - Forgot-password never reveals whether an account exists
/// - Every token failure is the same `InvalidToken`

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{
    Claims, CredentialVerifier, RotationEngine, TokenCodec, TokenPair, TokenPurpose,
};
use crate::configuration::{JwtSettings, PasswordSettings};
use crate::email_client::ResetNotifier;
use crate::error::{AuthError, StoreError};
use crate::store::Store;
use crate::user::{NewUser, User};
use crate::validators::{is_valid_email, is_valid_password, is_valid_username};

pub struct AuthService<S> {
    store: Arc<S>,
    codec: TokenCodec,
    rotation: RotationEngine<S>,
    verifier: CredentialVerifier,
    notifier: Arc<dyn ResetNotifier>,
    frontend_host: String,
}

impl<S: Store> AuthService<S> {
    /// # Errors
    /// Returns `HashingFailure` if the configured bcrypt cost is invalid
    pub fn new(
        store: Arc<S>,
        notifier: Arc<dyn ResetNotifier>,
        jwt: &JwtSettings,
        password: &PasswordSettings,
        frontend_host: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let codec = TokenCodec::new(jwt);
        let rotation = RotationEngine::new(Arc::clone(&store), codec.clone(), jwt.refresh_token_expiry);

        Ok(Self {
            store,
            codec,
            rotation,
            verifier: CredentialVerifier::new(password.bcrypt_cost)?,
            notifier,
            frontend_host: frontend_host.into(),
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create an account and start a session
    ///
    /// # Errors
    /// - `Validation` for malformed email, username or password
    /// - `AlreadyExists` if the email is taken
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<TokenPair, AuthError> {
        let email = is_valid_email(email)?;
        let username = is_valid_username(username)?;
        is_valid_password(password)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.hash(password).await?;
        let user = self
            .store
            .insert_user(&NewUser {
                email,
                username,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                StoreError::Conflict(_) => AuthError::AlreadyExists,
                other => other.into(),
            })?;

        tracing::info!(user_id = %user.id, "User registered successfully");
        self.rotation.issue(user.id).await
    }

    /// Authenticate with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let email = is_valid_email(email)?;

        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                self.verify_dummy(password).await;
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.verify(password, &user.password_hash).await? {
            tracing::warn!(user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in successfully");
        self.rotation.issue(user.id).await
    }

    /// Exchange a refresh token for a new pair
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.rotation.rotate(refresh_token).await
    }

    /// Revoke one refresh token
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.rotation.revoke(refresh_token).await
    }

    /// Revoke every refresh token of the user
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        self.rotation.revoke_all(user_id).await
    }

    /// Validate an access token presented as a bearer credential
    pub fn authenticate(&self, access_token: &str) -> Result<Claims, AuthError> {
        Ok(self.codec.validate(access_token, TokenPurpose::Access)?)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Send a reset link if the account exists.
    ///
    /// Succeeds either way. Delivery runs on a spawned task so the caller's
    /// latency does not depend on the account existing.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let email = is_valid_email(email)?;

        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                tracing::debug!("Password recovery requested for unknown email");
                return Ok(());
            }
        };

        let token = self.codec.issue_reset_token(&user.id)?;
        let reset_link = format!(
            "{}/reset-password?token={}",
            self.frontend_host.trim_end_matches('/'),
            urlencoding::encode(&token)
        );

        let notifier = Arc::clone(&self.notifier);
        let user_id = user.id;
        tokio::spawn(async move {
            if let Err(e) = notifier.send_password_reset(&user.email, &reset_link).await {
                tracing::error!(user_id = %user_id, error = %e, "Failed to deliver password reset link");
            }
        });

        tracing::info!(user_id = %user_id, "Password reset token issued");
        Ok(())
    }

    /// Set a new password using a reset token.
    ///
    /// The token is single-use. On success every refresh token of the user is
    /// revoked, so existing sessions must log in again.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let claims = self.codec.validate(token, TokenPurpose::PasswordReset)?;
        let user_id = claims.user_id()?;
        let jti = claims.jti.as_deref().ok_or(AuthError::InvalidToken)?;

        is_valid_password(new_password)?;

        let password_hash = self.hash(new_password).await?;

        // Token consumption, the hash update and session revocation land together
        if !self
            .store
            .reset_password(jti, user_id, claims.expires_at(), &password_hash)
            .await?
        {
            tracing::warn!(user_id = %user_id, "Password reset token already used or user gone");
            return Err(AuthError::InvalidToken);
        }

        tracing::info!(user_id = %user_id, "Password reset, all refresh tokens revoked");
        Ok(())
    }

    /// Round trip to the store for health reporting
    pub async fn store_health(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let verifier = self.verifier.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || verifier.hash(&password))
            .await
            .map_err(|e| AuthError::HashingFailure(e.to_string()))?
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let verifier = self.verifier.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || verifier.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::HashingFailure(e.to_string()))?
    }

    async fn verify_dummy(&self, password: &str) {
        let verifier = self.verifier.clone();
        let password = password.to_string();
        let _ = tokio::task::spawn_blocking(move || verifier.verify_dummy(&password)).await;
    }
}
