// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the client.

pub mod attendance;
pub mod auth;
pub mod geo;
pub mod user;

pub use attendance::{AttendanceRecord, AttendanceStatus, OpenCheckIn};
pub use auth::{LoginRequest, RefreshRequest, TokenPair};
pub use geo::GeoPoint;
pub use user::{Role, User};
