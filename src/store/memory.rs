/// In-memory store
///
/// Single mutex over all state, so every operation (including `rotate`) is
/// atomic. Intended for tests and local experiments.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{hash_token, NewRefreshToken, RefreshToken, TokenState};
use crate::error::StoreError;
use crate::store::{RefreshTokenStore, UserStore};
use crate::user::{NewUser, User};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    /// Keyed by SHA-256 of the token value
    refresh_tokens: HashMap<String, RefreshToken>,
    /// Consumed reset token ids and their expiry
    reset_token_uses: HashMap<String, DateTime<Utc>>,
}

impl State {
    fn insert_refresh_token(&mut self, token: &NewRefreshToken) -> Result<RefreshToken, StoreError> {
        let token_hash = token.token_hash();
        if self.refresh_tokens.contains_key(&token_hash) {
            return Err(StoreError::Conflict("refresh token value".to_string()));
        }

        let record = RefreshToken {
            id: Uuid::new_v4(),
            user_id: token.user_id,
            token_hash: token_hash.clone(),
            issued_at: Utc::now(),
            expires_at: token.expires_at,
            revoked: false,
            revoked_at: None,
        };
        self.refresh_tokens.insert(token_hash, record.clone());
        Ok(record)
    }

    fn revoke_all_for_user(&mut self, user_id: Uuid) -> u64 {
        let now = Utc::now();
        let mut revoked = 0;
        for record in self
            .refresh_tokens
            .values_mut()
            .filter(|t| t.user_id == user_id && !t.revoked)
        {
            record.revoked = true;
            record.revoked_at = Some(now);
            revoked += 1;
        }
        revoked
    }

    fn set_password_hash(&mut self, user_id: Uuid, password_hash: &str) -> bool {
        match self.users.get_mut(&user_id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                true
            }
            None => false,
        }
    }

    fn revoke_if_active(&mut self, value: &str) -> bool {
        let now = Utc::now();
        match self.refresh_tokens.get_mut(&hash_token(value)) {
            Some(record) if record.state(now) == TokenState::Active => {
                record.revoked = true;
                record.revoked_at = Some(now);
                true
            }
            _ => false,
        }
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    /// All refresh tokens ever issued to `user_id`, oldest first
    pub fn refresh_tokens_for(&self, user_id: Uuid) -> Result<Vec<RefreshToken>, StoreError> {
        let state = self.lock()?;
        let mut tokens: Vec<RefreshToken> = state
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tokens.sort_by_key(|t| t.issued_at);
        Ok(tokens)
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn insert(&self, token: &NewRefreshToken) -> Result<RefreshToken, StoreError> {
        self.lock()?.insert_refresh_token(token)
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<RefreshToken>, StoreError> {
        Ok(self.lock()?.refresh_tokens.get(&hash_token(value)).cloned())
    }

    async fn revoke(&self, value: &str) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if let Some(record) = state.refresh_tokens.get_mut(&hash_token(value)) {
            if !record.revoked {
                record.revoked = true;
                record.revoked_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn revoke_if_active(&self, value: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.revoke_if_active(value))
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        Ok(self.lock()?.revoke_all_for_user(user_id))
    }

    async fn rotate(
        &self,
        presented: &str,
        replacement: &NewRefreshToken,
    ) -> Result<Option<RefreshToken>, StoreError> {
        let mut state = self.lock()?;
        if state
            .refresh_tokens
            .contains_key(&replacement.token_hash())
        {
            return Err(StoreError::Conflict("refresh token value".to_string()));
        }
        if !state.revoke_if_active(presented) {
            return Ok(None);
        }
        state.insert_refresh_token(replacement).map(Some)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut state = self.lock()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email".to_string()));
        }

        let user = user.clone().into_user();
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.lock()?.set_password_hash(user_id, password_hash))
    }

    async fn reset_password(
        &self,
        jti: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        state.reset_token_uses.retain(|_, expiry| *expiry > now);

        if state.reset_token_uses.contains_key(jti) || !state.users.contains_key(&user_id) {
            return Ok(false);
        }
        state.reset_token_uses.insert(jti.to_string(), expires_at);
        state.set_password_hash(user_id, password_hash);
        state.revoke_all_for_user(user_id);
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
