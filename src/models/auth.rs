//! Auth endpoint request and response bodies.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Credentials posted to the login endpoint.
#[derive(Debug, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

/// Body posted to the refresh endpoint.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    pub refresh_token: &'a str,
}

/// Token pair returned by both the login and refresh endpoints.
///
/// `refresh` is optional: a refresh response may omit rotation of the
/// refresh token, in which case the stored one stays valid.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}
