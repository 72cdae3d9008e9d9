// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance check-in protocol.
//!
//! Handles:
//! - QR payload parsing with an authority gate
//! - Check-in: scan → geolocate → multipart submit
//! - Check-out: proximity gate (20 m) → photo → multipart submit
//! - Open check-in inference from the most recent remote record
//! - Re-entrancy guard against duplicate camera scan events

use crate::config::Config;
use crate::device::{Camera, CameraFacing, DeviceError, Geolocator};
use crate::error::{PortalError, Result};
use crate::models::{AttendanceRecord, OpenCheckIn};
use crate::services::gateway::{FormData, Gateway};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

/// Maximum distance from the check-in point at which a check-out is
/// accepted, in meters.
pub const MAX_CHECKOUT_DISTANCE_M: f64 = 20.0;

const HISTORY_PATH: &str = "/attendance/history";
const LAST_RECORD_PATH: &str = "/attendance/last";
const SUBMIT_PATH: &str = "/attendance";

/// Auditorium identity decomposed from a QR payload's path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auditorium {
    pub campus: String,
    pub corpus: String,
    pub room: String,
}

impl Auditorium {
    /// The slash-joined identifier submitted to the portal.
    pub fn id(&self) -> String {
        format!("{}/{}/{}", self.campus, self.corpus, self.room)
    }
}

/// Parse a scanned QR payload into an auditorium.
///
/// Any payload whose authority does not match the expected domain is
/// rejected before the path is even looked at. Missing path segments
/// degrade to empty-string fields rather than failing the scan.
pub fn parse_qr_payload(raw: &str, expected_authority: &str) -> Result<Auditorium> {
    let url = Url::parse(raw.trim()).map_err(|_| PortalError::InvalidQrCode)?;

    let authority_matches = url
        .host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(expected_authority));
    if !authority_matches {
        return Err(PortalError::InvalidQrCode);
    }

    let mut segments = url
        .path_segments()
        .map(|s| s.map(str::to_string).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter();

    Ok(Auditorium {
        campus: segments.next().unwrap_or_default(),
        corpus: segments.next().unwrap_or_default(),
        room: segments.next().unwrap_or_default(),
    })
}

/// Attendance check-in/check-out service.
///
/// Per-day state (`NotStarted → Started → Finished`) is owned by the
/// server; the client keeps only the inferred open check-in from the most
/// recent record.
#[derive(Clone)]
pub struct AttendanceService {
    gateway: Gateway,
    geolocator: Arc<dyn Geolocator>,
    camera: Arc<dyn Camera>,
    qr_authority: String,
    /// Set synchronously when a scan is accepted; the camera may emit
    /// several scan events for one physical code before the UI dismisses.
    scan_in_flight: Arc<AtomicBool>,
    open: Arc<Mutex<Option<OpenCheckIn>>>,
}

impl AttendanceService {
    pub fn new(
        config: &Config,
        gateway: Gateway,
        geolocator: Arc<dyn Geolocator>,
        camera: Arc<dyn Camera>,
    ) -> Self {
        Self {
            gateway,
            geolocator,
            camera,
            qr_authority: config.qr_authority.clone(),
            scan_in_flight: Arc::new(AtomicBool::new(false)),
            open: Arc::new(Mutex::new(None)),
        }
    }

    // ─── Read model ──────────────────────────────────────────────────────────

    pub async fn history(&self) -> Result<Vec<AttendanceRecord>> {
        self.gateway.get_json(HISTORY_PATH).await
    }

    /// Re-fetch the most recent record and re-derive the open check-in.
    pub async fn refresh_last_record(&self) -> Result<Option<AttendanceRecord>> {
        let record: Option<AttendanceRecord> = self.gateway.get_json(LAST_RECORD_PATH).await?;
        *self.open.lock().await = record.as_ref().and_then(AttendanceRecord::open_check_in);
        Ok(record)
    }

    /// The currently-open check-in, as of the last read-model refresh.
    pub async fn open_check_in(&self) -> Option<OpenCheckIn> {
        self.open.lock().await.clone()
    }

    // ─── Check-in (QR scan → submit) ─────────────────────────────────────────

    /// Submit a check-in for a scanned QR payload.
    ///
    /// The latch is flipped synchronously before the first suspension point,
    /// so a second scan event arriving while this attempt is in flight can
    /// never start a second submission; it is released only once the attempt
    /// fully resolves (success, rejection, or API error).
    pub async fn check_in(&self, raw_qr: &str) -> Result<OpenCheckIn> {
        if self
            .scan_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PortalError::ScanInProgress);
        }

        let result = self.submit_check_in(raw_qr).await;
        self.scan_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn submit_check_in(&self, raw_qr: &str) -> Result<OpenCheckIn> {
        // Authority check comes before any permission request.
        let auditorium = parse_qr_payload(raw_qr, &self.qr_authority)?;

        let here = self
            .geolocator
            .locate()
            .await
            .map_err(location_error)?;

        let form = FormData::default()
            .text("auditorium", auditorium.id())
            .text("geo", here.to_string());
        let _: serde_json::Value = self.gateway.post_multipart(SUBMIT_PATH, &form).await?;

        tracing::info!(auditorium = %auditorium.id(), "attendance check-in submitted");

        let open = OpenCheckIn {
            auditorium: auditorium.id(),
            start: here,
        };

        // Refresh the read model; if that fails, fall back to the local
        // reconstruction so the check-out still has its start point.
        if let Err(err) = self.refresh_last_record().await {
            tracing::warn!(error = %err, "read-model refresh failed after check-in");
            *self.open.lock().await = Some(open.clone());
        }

        Ok(open)
    }

    // ─── Check-out (proximity-gated) ─────────────────────────────────────────

    /// Finish the day's open check-in.
    ///
    /// Requires an open check-in in memory, the current position within
    /// 20 m of the check-in point, and a usable photo. None of the failure
    /// paths is retried; the user re-initiates.
    pub async fn check_out(&self) -> Result<()> {
        let open = self
            .open
            .lock()
            .await
            .clone()
            .ok_or(PortalError::NoActiveCheckIn)?;

        let here = self
            .geolocator
            .locate()
            .await
            .map_err(location_error)?;

        let distance = open.start.distance_m(&here);
        if distance > MAX_CHECKOUT_DISTANCE_M {
            return Err(PortalError::TooFarFromStart {
                distance_m: distance.round() as u32,
                limit_m: MAX_CHECKOUT_DISTANCE_M as u32,
            });
        }

        let photo = self
            .camera
            .capture(CameraFacing::Front)
            .await
            .map_err(camera_error)?;

        let form = FormData::default()
            .text("auditorium", open.auditorium.clone())
            .text("geo", here.to_string())
            .file("image", photo.file_name, photo.mime, photo.bytes);
        let _: serde_json::Value = self.gateway.post_multipart(SUBMIT_PATH, &form).await?;

        tracing::info!(auditorium = %open.auditorium, "attendance check-out submitted");

        if self.refresh_last_record().await.is_err() {
            // The record is finished server-side even if the re-read failed.
            *self.open.lock().await = None;
        }

        Ok(())
    }
}

fn location_error(err: DeviceError) -> PortalError {
    match err {
        DeviceError::PermissionDenied | DeviceError::Cancelled => {
            PortalError::PermissionDenied("location")
        }
        DeviceError::Unavailable(msg) => {
            PortalError::Internal(anyhow::anyhow!("location unavailable: {}", msg))
        }
    }
}

fn camera_error(err: DeviceError) -> PortalError {
    match err {
        DeviceError::PermissionDenied => PortalError::PermissionDenied("camera"),
        DeviceError::Cancelled => PortalError::PhotoCaptureCancelled,
        DeviceError::Unavailable(msg) => PortalError::PhotoCaptureFailed(msg),
    }
}
