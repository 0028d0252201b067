/// JWT Token Generation and Validation
///
/// `TokenCodec` issues and validates the signed token kinds (access and
/// password reset). It holds no mutable state; the signing secret is injected
/// once at construction.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenPurpose};
use crate::configuration::JwtSettings;
use crate::error::{AuthError, TokenError};

const RESET_TOKEN_ID_LENGTH: usize = 32;

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_token_expiry: i64,
    reset_token_expiry: i64,
}

impl TokenCodec {
    pub fn new(config: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            access_token_expiry: config.access_token_expiry,
            reset_token_expiry: config.reset_token_expiry,
        }
    }

    /// Access token lifetime in seconds
    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    /// Generate a new access token for a user
    ///
    /// # Errors
    /// Returns `TokenIssuance` if signing fails
    pub fn issue_access_token(&self, user_id: &Uuid) -> Result<String, AuthError> {
        let claims = Claims::new(
            *user_id,
            TokenPurpose::Access,
            self.access_token_expiry,
            self.issuer.clone(),
        );
        self.sign(&claims)
    }

    /// Generate a password reset token for a user
    ///
    /// Reset tokens carry a random `jti` so a consumed token can be recognized.
    pub fn issue_reset_token(&self, user_id: &Uuid) -> Result<String, AuthError> {
        let jti: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RESET_TOKEN_ID_LENGTH)
            .map(char::from)
            .collect();
        let claims = Claims::new(
            *user_id,
            TokenPurpose::PasswordReset,
            self.reset_token_expiry,
            self.issuer.clone(),
        )
        .with_jti(jti);
        self.sign(&claims)
    }

    /// Validate a token and extract its claims
    ///
    /// Checks, in order: framing and signature, `exp`/`nbf` with no leeway,
    /// issuer, then the purpose discriminator.
    pub fn validate(&self, token: &str, expected: TokenPurpose) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "sub", "iss"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::ImmatureSignature => TokenError::NotYetValid,
                _ => TokenError::Malformed,
            })?;

        if claims.purpose != expected {
            tracing::warn!(
                expected = ?expected,
                presented = ?claims.purpose,
                "Token presented for the wrong purpose"
            );
            return Err(TokenError::WrongPurpose);
        }

        Ok(claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenIssuance(e.to_string()))
    }
}
