// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! KSTU portal client.
//!
//! This crate provides the client-side core of the university portal app:
//! token-based session lifecycle with silent refresh and local unlock, an
//! HTTP gateway with a single 401 refresh-and-retry policy, and the
//! QR/geolocation attendance check-in protocol.

pub mod config;
pub mod device;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

use config::Config;
use device::{Camera, Geolocator};
use error::Result;
use services::{AttendanceService, Gateway, PortalService, SessionController};
use std::sync::Arc;
use store::SecureStore;

/// Fully wired portal client.
pub struct PortalClient {
    pub session: SessionController,
    pub attendance: AttendanceService,
    pub api: PortalService,
}

impl PortalClient {
    /// Wire the client from config, a secure store and device capabilities.
    ///
    /// Call [`SessionController::initialize`] once after construction.
    pub fn new(
        config: &Config,
        store: SecureStore,
        geolocator: Arc<dyn Geolocator>,
        camera: Arc<dyn Camera>,
    ) -> Result<Self> {
        let session = SessionController::new(config, store)?;
        let gateway = Gateway::new(config, session.clone())?;
        let attendance = AttendanceService::new(config, gateway.clone(), geolocator, camera);
        let api = PortalService::new(gateway);

        Ok(Self {
            session,
            attendance,
            api,
        })
    }
}
