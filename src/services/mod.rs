// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - client logic layer.

pub mod attendance;
pub mod codec;
pub mod gateway;
pub mod portal;
pub mod session;

pub use attendance::{AttendanceService, Auditorium};
pub use gateway::{FormData, Gateway};
pub use portal::PortalService;
pub use session::{AuthApi, SessionController, SessionPhase};
