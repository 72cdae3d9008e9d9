// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device capability seams: geolocation, camera, biometric challenge.
//!
//! The mobile platform APIs are external capabilities consumed, not
//! implemented; an embedding application supplies real adapters, the CLI
//! ships flag/file-based ones and the tests ship programmable stubs.

use crate::models::GeoPoint;
use async_trait::async_trait;
use std::path::PathBuf;

/// Errors from device capabilities.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("cancelled by user")]
    Cancelled,

    #[error("capability unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    Front,
    Rear,
}

/// A captured photo ready for multipart upload.
#[derive(Debug, Clone)]
pub struct Photo {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: String,
}

/// Foreground geolocation with at least balanced accuracy.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<GeoPoint, DeviceError>;
}

/// Still-photo capture.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn capture(&self, facing: CameraFacing) -> Result<Photo, DeviceError>;
}

/// Biometric capability query and challenge.
#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    async fn is_available(&self) -> bool;
    async fn challenge(&self, reason: &str) -> Result<(), DeviceError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// CLI adapters
// ─────────────────────────────────────────────────────────────────────────────

/// Geolocator that reports a fixed position (CLI flags, tests).
pub struct FixedGeolocator(pub GeoPoint);

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn locate(&self) -> Result<GeoPoint, DeviceError> {
        Ok(self.0)
    }
}

/// Camera that serves a photo from a file on disk.
pub struct FilePhotoCamera {
    pub path: PathBuf,
}

#[async_trait]
impl Camera for FilePhotoCamera {
    async fn capture(&self, _facing: CameraFacing) -> Result<Photo, DeviceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| DeviceError::Unavailable(format!("{}: {}", self.path.display(), e)))?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo.jpg".to_string());

        Ok(Photo {
            bytes,
            file_name,
            mime: "image/jpeg".to_string(),
        })
    }
}
