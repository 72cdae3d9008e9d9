// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Decode-only access token codec.
//!
//! Extracts the user identity embedded in the access token payload. The
//! client never verifies the signature — the server is the verifying party
//! for every real action — so this is a pure string-to-struct function with
//! no I/O and no failure surface: anything structurally wrong yields `None`.

use crate::models::{Role, User};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::NaiveDate;
use serde::Deserialize;

/// Token claims; only the nested identity object matters to the client.
#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    user: Option<TokenIdentity>,
}

/// The identity object the portal embeds in access tokens.
#[derive(Debug, Deserialize)]
struct TokenIdentity {
    id: u64,
    #[serde(default)]
    firstname: String,
    #[serde(default)]
    lastname: String,
    #[serde(default)]
    patronymic: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    birth_date: Option<String>,
    /// Single-character user-type code ("S", "T", or other)
    #[serde(default)]
    user_type: Option<String>,
    #[serde(default)]
    notify_count: u32,
}

/// Decode the user identity from an access token.
///
/// Returns `None` for a malformed token or a payload without the identity
/// object. An unparseable birth date degrades to `None` for that field
/// only, not a decode failure.
pub fn decode_user(token: &str) -> Option<User> {
    let payload = token.split('.').nth(1)?;
    // Some token producers pad the base64url segments; ours should not,
    // but tolerate it.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    let identity = claims.user?;

    Some(User {
        id: identity.id,
        first_name: identity.firstname,
        last_name: identity.lastname,
        patronymic: identity.patronymic,
        email: identity.email,
        phone: identity.phone,
        avatar: identity.avatar,
        gender: identity.gender,
        birth_date: identity
            .birth_date
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()),
        role: Role::from_code(identity.user_type.as_deref()),
        notifications: identity.notify_count,
    })
}
