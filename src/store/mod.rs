/// Persistence contract for credentials and refresh tokens
///
/// The rotation engine and the credential service only depend on these
/// traits. `memory::InMemoryStore` backs tests, `postgres::PgStore` backs
/// the running service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{NewRefreshToken, RefreshToken};
use crate::error::StoreError;
use crate::user::{NewUser, User};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Durable record of issued refresh tokens.
///
/// Tokens are addressed by their plaintext value; backends decide how the
/// value is stored.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a new token. Fails with `Conflict` if the value already exists.
    async fn insert(&self, token: &NewRefreshToken) -> Result<RefreshToken, StoreError>;

    async fn find_by_value(&self, value: &str) -> Result<Option<RefreshToken>, StoreError>;

    /// Mark one token revoked. Unknown values and repeated calls are no-ops.
    async fn revoke(&self, value: &str) -> Result<(), StoreError>;

    /// Revoke the token only if it is currently unrevoked and unexpired.
    ///
    /// Returns `true` for exactly one caller per token value.
    async fn revoke_if_active(&self, value: &str) -> Result<bool, StoreError>;

    /// Revoke every token owned by `user_id`; returns how many were flipped.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// Revoke `presented` and insert `replacement` as one unit.
    ///
    /// Returns `None` without inserting anything when `presented` was no
    /// longer active. Backends with transactions should override this; the
    /// default keeps the single-winner guarantee of `revoke_if_active` but
    /// leaves a window between the two writes.
    async fn rotate(
        &self,
        presented: &str,
        replacement: &NewRefreshToken,
    ) -> Result<Option<RefreshToken>, StoreError> {
        if !self.revoke_if_active(presented).await? {
            return Ok(None);
        }
        self.insert(replacement).await.map(Some)
    }
}

/// Credential records and consumed password reset tokens
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    /// Overwrite the stored password hash. Returns `false` if the user is gone.
    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, StoreError>;

    /// Apply a password reset as one unit: record `jti` as used, overwrite
    /// the password hash and revoke every refresh token of the user.
    ///
    /// Returns `false` and changes nothing if `jti` was used before or the
    /// user is gone. `expires_at` is the reset token's own expiry; used ids
    /// past it can be forgotten.
    async fn reset_password(
        &self,
        jti: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<bool, StoreError>;

    /// Cheap round trip to the backend for health reporting
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Everything the authentication service needs from one backend
pub trait Store: UserStore + RefreshTokenStore + 'static {}

impl<T> Store for T where T: UserStore + RefreshTokenStore + 'static {}
