// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: login, silent refresh, local unlock.
//!
//! Handles:
//! - Loading the token pair from the secure store at boot
//! - Login and token refresh against the portal auth endpoints
//! - Atomic token-pair persistence with in-memory state
//! - Rebuilding the decoded user on every token change
//! - PIN / biometric local unlock for a device holding a refresh token

use crate::config::Config;
use crate::device::BiometricAuthenticator;
use crate::error::{PortalError, Result};
use crate::models::{LoginRequest, RefreshRequest, TokenPair, User};
use crate::services::codec;
use crate::store::{keys, SecureStore};
use std::sync::Arc;
use tokio::sync::RwLock;
use validator::Validate;

/// Low-level auth endpoint client.
///
/// Plain requests with no bearer token and no interception: the refresh
/// call must bypass the gateway's own 401 handling to avoid recursion.
#[derive(Clone)]
pub struct AuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl AuthApi {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PortalError::Internal(anyhow::anyhow!("http client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Exchange credentials for a token pair.
    pub async fn login(&self, request: &LoginRequest) -> Result<TokenPair> {
        let url = format!("{}/auth/login", self.base_url);
        let response = self.http.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();

            // Credential rejections become a user-displayable login error;
            // anything else surfaces as an ordinary API error.
            if (400..=403).contains(&status) {
                let mut message = crate::error::extract_message(&body);
                if message.is_empty() {
                    message = "Invalid username or password".to_string();
                }
                return Err(PortalError::AuthenticationFailed(message));
            }
            return Err(PortalError::api(status, &body));
        }

        response.json().await.map_err(PortalError::from)
    }

    /// Mint a new token pair from a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let url = format!("{}/auth/refresh", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PortalError::api(status, &body));
        }

        response.json().await.map_err(PortalError::from)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionController - owns auth state and the unlock flow
// ─────────────────────────────────────────────────────────────────────────────

/// Derived top-level session phase, driving navigation in the embedding app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Unauthenticated,
    /// A refresh token is present but no access token: the device was
    /// authenticated before and needs a local unlock (PIN or biometric).
    Locked,
    Authenticated,
}

#[derive(Debug, Default)]
struct SessionState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<User>,
    last_error: Option<String>,
    is_initialized: bool,
}

/// Process-wide session controller.
///
/// Cheap to clone; all clones share one state. Mutating operations replace
/// the relevant fields atomically relative to readers — no reader ever
/// observes an access token and a user that disagree.
#[derive(Clone)]
pub struct SessionController {
    auth: AuthApi,
    store: SecureStore,
    state: Arc<RwLock<SessionState>>,
}

impl SessionController {
    pub fn new(config: &Config, store: SecureStore) -> Result<Self> {
        Ok(Self {
            auth: AuthApi::new(config)?,
            store,
            state: Arc::new(RwLock::new(SessionState::default())),
        })
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Load the persisted token pair and derive the initial session state.
    ///
    /// Idempotent: only the first call does work. Storage failures degrade
    /// to an unauthenticated session; this never fails the boot sequence.
    pub async fn initialize(&self) {
        if self.state.read().await.is_initialized {
            return;
        }

        let access = self.store.get(keys::ACCESS_TOKEN).await;
        let refresh = self.store.get(keys::REFRESH_TOKEN).await;

        let mut state = self.state.write().await;
        if state.is_initialized {
            return;
        }

        state.refresh_token = refresh;

        if let Some(token) = access {
            match codec::decode_user(&token) {
                Some(user) => {
                    state.access_token = Some(token);
                    state.user = Some(user);
                }
                None => {
                    // Drop the bad token: with a refresh token still present
                    // the device lands in Locked, otherwise Unauthenticated.
                    tracing::warn!("stored access token does not decode, discarding");
                }
            }
        }

        state.is_initialized = true;
        tracing::info!(
            authenticated = state.access_token.is_some(),
            locked = state.access_token.is_none() && state.refresh_token.is_some(),
            "session initialized"
        );
    }

    pub async fn phase(&self) -> SessionPhase {
        let state = self.state.read().await;
        if !state.is_initialized {
            SessionPhase::Uninitialized
        } else if state.access_token.is_some() {
            SessionPhase::Authenticated
        } else if state.refresh_token.is_some() {
            SessionPhase::Locked
        } else {
            SessionPhase::Unauthenticated
        }
    }

    // ─── Token management ────────────────────────────────────────────────────

    /// Authenticate with username/password.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        request
            .validate()
            .map_err(|e| PortalError::InvalidInput(e.to_string()))?;

        match self.auth.login(&request).await {
            Ok(pair) => {
                self.set_tokens(pair.access, pair.refresh).await;
                self.state.write().await.last_error = None;
                tracing::info!(username, "login successful");
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                self.state.write().await.last_error = Some(message.clone());
                tracing::warn!(username, error = %message, "login failed");
                match err {
                    PortalError::AuthenticationFailed(_) => Err(err),
                    _ => Err(PortalError::AuthenticationFailed(message)),
                }
            }
        }
    }

    /// Apply and persist a new token pair.
    ///
    /// The access token is always updated; the refresh token only when one
    /// is supplied (refresh responses may omit rotation). The user is
    /// recomputed from the new access token as the final step, under the
    /// same write lock, so token and user never observably disagree.
    pub async fn set_tokens(&self, access: String, refresh: Option<String>) {
        let mut state = self.state.write().await;

        match &refresh {
            Some(refresh_token) => {
                self.store
                    .set_batch(&[
                        (keys::ACCESS_TOKEN, access.as_str()),
                        (keys::REFRESH_TOKEN, refresh_token.as_str()),
                    ])
                    .await;
            }
            None => self.store.set(keys::ACCESS_TOKEN, &access).await,
        }

        state.user = codec::decode_user(&access);
        state.access_token = Some(access);
        if let Some(refresh_token) = refresh {
            state.refresh_token = Some(refresh_token);
        }
    }

    /// Mint a new access token from the stored refresh token.
    ///
    /// This is the single fatal path: any failure (no refresh token,
    /// network error, rejected refresh token) forces a logout and the
    /// caller gets `SessionExpired`.
    pub async fn refresh_access_token(&self) -> Result<()> {
        let refresh = self.state.read().await.refresh_token.clone();
        let refresh = match refresh {
            Some(token) => Some(token),
            // Session state may be stale relative to the store.
            None => self.store.get(keys::REFRESH_TOKEN).await,
        };

        let Some(refresh) = refresh else {
            tracing::warn!("no refresh token available, forcing logout");
            self.logout().await;
            return Err(PortalError::SessionExpired);
        };

        match self.auth.refresh(&refresh).await {
            Ok(pair) => {
                self.set_tokens(pair.access, pair.refresh).await;
                tracing::info!("access token refreshed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed, forcing logout");
                self.logout().await;
                Err(PortalError::SessionExpired)
            }
        }
    }

    /// Clear the session, locally and in the store.
    ///
    /// The PIN and biometric flag survive: they are scoped to the device,
    /// not the account, so the next login keeps its local unlock setup.
    pub async fn logout(&self) {
        let mut state = self.state.write().await;
        self.store
            .remove(&[keys::ACCESS_TOKEN, keys::REFRESH_TOKEN])
            .await;
        state.access_token = None;
        state.refresh_token = None;
        state.user = None;
        state.last_error = None;
        tracing::info!("session cleared");
    }

    // ─── Local unlock (PIN / biometric) ──────────────────────────────────────

    /// Store a PIN for local unlock. Created lazily, after login, not
    /// during it.
    pub async fn set_pin_code(&self, pin: &str) -> Result<()> {
        if pin.len() < 4 || pin.len() > 8 || !pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PortalError::InvalidInput(
                "PIN must be 4-8 digits".to_string(),
            ));
        }
        let hash = hash_pin(pin)?;
        self.store.set(keys::PIN_CODE, &hash).await;
        Ok(())
    }

    /// Verify a PIN against the stored credential. Local only, never a
    /// network call.
    pub async fn verify_pin_code(&self, pin: &str) -> bool {
        match self.store.get(keys::PIN_CODE).await {
            Some(stored) => verify_pin(pin, &stored),
            None => false,
        }
    }

    pub async fn has_pin_code(&self) -> bool {
        self.store.get(keys::PIN_CODE).await.is_some()
    }

    pub async fn set_biometric_enabled(&self, enabled: bool) {
        self.store
            .set(keys::BIOMETRIC_ENABLED, if enabled { "true" } else { "false" })
            .await;
    }

    pub async fn is_biometric_enabled(&self) -> bool {
        self.store.get(keys::BIOMETRIC_ENABLED).await.as_deref() == Some("true")
    }

    /// Unlock a Locked session with the device PIN, then refresh.
    pub async fn unlock_with_pin(&self, pin: &str) -> Result<()> {
        if !self.verify_pin_code(pin).await {
            return Err(PortalError::AuthenticationFailed("Wrong PIN".to_string()));
        }
        self.refresh_access_token().await
    }

    /// Unlock a Locked session with a biometric challenge, then refresh.
    pub async fn unlock_with_biometric(
        &self,
        authenticator: &dyn BiometricAuthenticator,
    ) -> Result<()> {
        if !self.is_biometric_enabled().await {
            return Err(PortalError::AuthenticationFailed(
                "Biometric unlock is not enabled".to_string(),
            ));
        }
        if !authenticator.is_available().await {
            return Err(PortalError::PermissionDenied("biometric"));
        }

        authenticator
            .challenge("Unlock your portal session")
            .await
            .map_err(|err| match err {
                crate::device::DeviceError::Cancelled => {
                    PortalError::AuthenticationFailed("Biometric challenge cancelled".to_string())
                }
                crate::device::DeviceError::PermissionDenied => {
                    PortalError::PermissionDenied("biometric")
                }
                crate::device::DeviceError::Unavailable(msg) => {
                    PortalError::AuthenticationFailed(msg)
                }
            })?;

        self.refresh_access_token().await
    }

    // ─── State accessors ─────────────────────────────────────────────────────

    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token.clone()
    }

    /// Refresh token from state, falling back to a direct store read.
    pub async fn has_refresh_token(&self) -> bool {
        if self.state.read().await.refresh_token.is_some() {
            return true;
        }
        self.store.get(keys::REFRESH_TOKEN).await.is_some()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.is_initialized
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PIN credential hashing
// ─────────────────────────────────────────────────────────────────────────────

use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const PIN_SALT_LEN: usize = 16;

/// Hash a PIN as `hex(salt)$hex(hmac-sha256(salt, pin))`.
fn hash_pin(pin: &str) -> Result<String> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; PIN_SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| PortalError::Internal(anyhow::anyhow!("system RNG unavailable")))?;

    let mut mac = HmacSha256::new_from_slice(&salt)
        .map_err(|e| PortalError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(pin.as_bytes());

    Ok(format!(
        "{}${}",
        hex::encode(salt),
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Constant-time verification against a stored `salt$mac` credential.
/// A malformed stored value verifies as false, never as an error.
fn verify_pin(pin: &str, stored: &str) -> bool {
    let Some((salt_hex, mac_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(mac_hex)) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(&salt) else {
        return false;
    };
    mac.update(pin.as_bytes());
    let computed = mac.finalize().into_bytes();

    computed.ct_eq(expected.as_slice()).into()
}
