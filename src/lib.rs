//! Authentication token lifecycle: access tokens, rotating refresh tokens
//! with reuse detection, and single-use password reset tokens.

pub mod auth;
pub mod configuration;
pub mod email_client;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod service;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod user;
pub mod validators;
