// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! On-device secure key-value store for session credentials.
//!
//! Holds the access/refresh token pair, the PIN credential hash and the
//! biometric-enabled flag. Every operation is infallible from the caller's
//! point of view: read failures degrade to "absent" and write failures are
//! logged and swallowed, so a corrupt store can never break the boot
//! sequence — the session simply comes up unauthenticated.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Well-known store keys.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const PIN_CODE: &str = "pin_code";
    pub const BIOMETRIC_ENABLED: &str = "biometric_enabled";
}

/// Persistent key-value store backed by a JSON file.
///
/// The file is replaced atomically (temp file + rename) on every write, so
/// a batched token-pair update is either fully visible or not at all.
#[derive(Clone)]
pub struct SecureStore {
    path: Option<Arc<PathBuf>>,
    entries: Arc<DashMap<String, String>>,
}

impl SecureStore {
    /// Open (or create) a store at the given path.
    ///
    /// An unreadable or corrupt file starts the store empty.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = DashMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(map) => {
                    for (key, value) in map {
                        entries.insert(key, value);
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, path = %path.display(), "secure store corrupt, starting empty");
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "secure store unreadable, starting empty");
            }
        }

        Self {
            path: Some(Arc::new(path)),
            entries: Arc::new(entries),
        }
    }

    /// Create a store that never touches disk (for tests).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Arc::new(DashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub async fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist().await;
    }

    /// Write several entries in one atomic file replacement.
    ///
    /// The session controller uses this to persist the access/refresh token
    /// pair together.
    pub async fn set_batch(&self, batch: &[(&str, &str)]) {
        for (key, value) in batch {
            self.entries.insert(key.to_string(), value.to_string());
        }
        self.persist().await;
    }

    pub async fn remove(&self, remove_keys: &[&str]) {
        for key in remove_keys {
            self.entries.remove(*key);
        }
        self.persist().await;
    }

    /// Write the current map to disk via a temp file and rename.
    async fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let map: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let serialized = match serde_json::to_string_pretty(&map) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize secure store");
                return;
            }
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = tokio::fs::create_dir_all(parent).await {
                    tracing::warn!(error = %err, "failed to create secure store directory");
                    return;
                }
            }
        }

        let tmp = path.with_extension("tmp");
        if let Err(err) = tokio::fs::write(&tmp, serialized).await {
            tracing::warn!(error = %err, path = %tmp.display(), "failed to write secure store");
            return;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(err) =
                tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await
            {
                tracing::warn!(error = %err, "failed to restrict secure store permissions");
            }
        }

        if let Err(err) = tokio::fs::rename(&tmp, path.as_ref()).await {
            tracing::warn!(error = %err, path = %path.display(), "failed to replace secure store");
        }
    }
}
