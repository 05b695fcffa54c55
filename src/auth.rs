mod login;
mod logout;
mod register;

use axum::{routing::post, Router};

use crate::{AppError, AppState};

pub use login::login;
pub use logout::logout;
pub use register::register;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub(crate) fn validate_username(username: &str) -> Result<(), AppError> {
    if username.len() < 3 {
        return Err(AppError::InvalidOperation("username must be at least 3 characters long"));
    }
    if username.len() > 20 {
        return Err(AppError::InvalidOperation("username must be at most 20 characters long"));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::InvalidOperation(
            "username can only contain letters, numbers, and underscores",
        ));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::InvalidOperation("password must be at least 8 characters long"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::InvalidOperation("password must contain at least one uppercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(AppError::InvalidOperation("password must contain at least one lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidOperation("password must contain at least one digit"));
    }
    Ok(())
}
