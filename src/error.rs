// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error types with user-displayable messages.

/// Client error type covering the session, gateway and attendance flows.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Session expired, sign in again")]
    SessionExpired,

    #[error("QR code is not a portal attendance code")]
    InvalidQrCode,

    #[error("Too far from the check-in point: {distance_m} m (limit {limit_m} m)")]
    TooFarFromStart { distance_m: u32, limit_m: u32 },

    #[error("No active check-in to finish")]
    NoActiveCheckIn,

    #[error("A scan is already being submitted")]
    ScanInProgress,

    #[error("Permission denied: {0}")]
    PermissionDenied(&'static str),

    #[error("Photo capture cancelled")]
    PhotoCaptureCancelled,

    #[error("Photo capture failed: {0}")]
    PhotoCaptureFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Portal API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PortalError {
    /// Build an API error from a response status and raw body.
    pub fn api(status: u16, body: &str) -> Self {
        PortalError::Api {
            status,
            message: extract_message(body),
        }
    }

    /// True for errors that mean the session credentials are no longer valid.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            PortalError::SessionExpired | PortalError::Api { status: 401, .. }
        )
    }
}

/// Best-effort extraction of a display message from an error body.
///
/// The portal wraps errors as `{"message": ...}` or `{"detail": ...}`;
/// fall back to the raw body.
pub fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "detail", "error"]
                .iter()
                .find_map(|k| v.get(k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PortalError::Network(format!("request timed out: {}", err))
        } else {
            PortalError::Network(err.to_string())
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, PortalError>;
