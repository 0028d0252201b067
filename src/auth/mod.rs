/// Authentication module
///
/// Handles JWT token generation/validation, password hashing,
/// refresh token records, and refresh token rotation.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod rotation;

pub use claims::{Claims, TokenPurpose};
pub use jwt::TokenCodec;
pub use password::{hash_password, verify_password, CredentialVerifier};
pub use refresh_token::{
    generate_refresh_token, hash_token, NewRefreshToken, RefreshToken, TokenState,
};
pub use rotation::{RotationEngine, TokenPair};
