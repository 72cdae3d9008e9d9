// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance records as served by the portal.

use crate::models::geo::GeoPoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Status strings used by the backend (verbatim, Russian).
pub mod status_info {
    pub const STARTED: &str = "Начат";
    pub const FINISHED: &str = "Завершен";
}

/// Parsed day status of an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Started,
    Finished,
}

impl AttendanceStatus {
    pub fn from_status_info(raw: &str) -> Option<Self> {
        match raw.trim() {
            status_info::STARTED => Some(AttendanceStatus::Started),
            status_info::FINISHED => Some(AttendanceStatus::Finished),
            _ => None,
        }
    }
}

/// A single day's check-in/check-out record, remote-authoritative.
///
/// Every field is optional: the backend omits fields freely depending on
/// record state, and a missing field must never fail deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub auditorium: Option<String>,
    /// Check-in coordinates, formatted `"lat, lon"`
    #[serde(default)]
    pub start_geo: Option<String>,
    /// Check-out coordinates, formatted `"lat, lon"`
    #[serde(default)]
    pub end_geo: Option<String>,
    #[serde(default)]
    pub start_photo: Option<String>,
    #[serde(default)]
    pub end_photo: Option<String>,
    /// Working time computed server-side, e.g. `"7:45"`
    #[serde(default)]
    pub working_time: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub status_info: Option<String>,
}

impl AttendanceRecord {
    pub fn status(&self) -> Option<AttendanceStatus> {
        self.status_info
            .as_deref()
            .and_then(AttendanceStatus::from_status_info)
    }

    /// Reconstruct the currently-open check-in, if this record represents one.
    ///
    /// The client infers the open record from the most recent record's
    /// status rather than tracking an id returned from "start". A record
    /// counts as open only when its status is Started and its check-in
    /// coordinates parse.
    pub fn open_check_in(&self) -> Option<OpenCheckIn> {
        if self.status() != Some(AttendanceStatus::Started) {
            return None;
        }

        let start: GeoPoint = self.start_geo.as_deref()?.parse().ok()?;

        Some(OpenCheckIn {
            auditorium: self.auditorium.clone().unwrap_or_default(),
            start,
        })
    }
}

/// The in-memory view of a "Started"-but-not-"Finished" record, carried
/// forward into the proximity-gated check-out.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenCheckIn {
    pub auditorium: String,
    pub start: GeoPoint,
}
