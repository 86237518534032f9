use serde::{Deserialize, Serialize};

/// Body for `POST /auth/signup`.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
}

/// Body for `POST /auth/pwregist`.
#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

/// Body for `POST /auth/basic`.
#[derive(Debug, Deserialize)]
pub struct BasicLoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for `POST /auth/contact`.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Bearer token handed back after guest login or basic login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Human-readable outcome for routes without a data payload.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Query string of the OAuth callback routes.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
}
