/// Middleware module
///
/// Custom actix middleware for request authentication.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
