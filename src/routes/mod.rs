mod auth;
mod health_check;

pub use auth::{
    get_current_user, login, logout, logout_all, recover_password, refresh, register,
    reset_password, LoginRequest, RecoverPasswordRequest, RefreshRequest, RegisterRequest,
    ResetPasswordRequest, UserResponse,
};
pub use health_check::{health, health_check};
