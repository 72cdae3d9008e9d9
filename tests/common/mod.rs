// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test harness: a mock portal backend on an ephemeral port with
//! per-endpoint call counters, plus programmable device stubs.

use async_trait::async_trait;
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use kstu_portal::config::Config;
use kstu_portal::device::{
    BiometricAuthenticator, Camera, CameraFacing, DeviceError, Geolocator, Photo,
};
use kstu_portal::models::GeoPoint;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Mock portal backend
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockState {
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    pub submissions: AtomicUsize,

    pub fail_login: AtomicBool,
    pub fail_refresh: AtomicBool,
    pub fail_profile: AtomicBool,
    /// Protected routes reject every bearer token when set.
    pub always_unauthorized: AtomicBool,
    pub submit_delay_ms: AtomicU64,

    /// The bearer token protected routes currently accept.
    pub valid_token: Mutex<String>,
    pub last_record: Mutex<Option<Value>>,
    pub last_submission: Mutex<Option<HashMap<String, String>>>,
}

impl MockState {
    /// Rotate the accepted token server-side without telling the client,
    /// so its next request 401s.
    #[allow(dead_code)]
    pub fn invalidate_client_token(&self) {
        *self.valid_token.lock().unwrap() = "rotated-away".to_string();
    }
}

pub struct MockPortal {
    pub base_url: String,
    pub state: Arc<MockState>,
}

/// Mint a structurally real access token with the portal's identity payload.
#[allow(dead_code)]
pub fn mint_access_token(id: u64, user_type: &str) -> String {
    let claims = json!({
        "exp": 4102444800u64,
        "user": {
            "id": id,
            "firstname": "Aibek",
            "lastname": "Asanov",
            "user_type": user_type,
            "notify_count": 2
        }
    });
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"mock-portal-key"),
    )
    .expect("failed to mint token")
}

fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    if state.always_unauthorized.load(Ordering::SeqCst) {
        return false;
    }
    let expected = format!("Bearer {}", state.valid_token.lock().unwrap());
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|h| h == expected)
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Authentication credentials were not provided or are invalid"})),
    )
        .into_response()
}

async fn login(State(state): State<Arc<MockState>>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);

    if state.fail_login.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid username or password"})),
        )
            .into_response();
    }

    let access = mint_access_token(742, "S");
    *state.valid_token.lock().unwrap() = access.clone();
    Json(json!({"access": access, "refresh": "refresh-token-1"})).into_response()
}

async fn refresh(State(state): State<Arc<MockState>>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    if state.fail_refresh.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Refresh token expired"})),
        )
            .into_response();
    }

    let access = mint_access_token(742, "S");
    *state.valid_token.lock().unwrap() = access.clone();
    Json(json!({"access": access, "refresh": "refresh-token-2"})).into_response()
}

async fn profile(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.profile_calls.fetch_add(1, Ordering::SeqCst);

    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if state.fail_profile.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "boom"})),
        )
            .into_response();
    }
    Json(json!({"id": 742, "firstname": "Aibek", "lastname": "Asanov"})).into_response()
}

/// Peripheral list endpoints: empty collections are enough for the
/// pass-through reads.
async fn empty_list(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!([])).into_response()
}

async fn last_record(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let record = state.last_record.lock().unwrap().clone();
    Json(record.unwrap_or(Value::Null)).into_response()
}

async fn history(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let record = state.last_record.lock().unwrap().clone();
    let records: Vec<Value> = record.into_iter().collect();
    Json(Value::Array(records)).into_response()
}

/// Attendance submission: discriminates start/finish by the presence of an
/// open record, like the real backend.
async fn submit(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let delay = state.submit_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let bytes = field.bytes().await.unwrap();
            fields.insert(name, format!("{} bytes", bytes.len()));
        } else {
            fields.insert(name, field.text().await.unwrap());
        }
    }

    state.submissions.fetch_add(1, Ordering::SeqCst);

    let mut record = state.last_record.lock().unwrap();
    let open = record
        .as_ref()
        .and_then(|r| r.get("status_info"))
        .and_then(|s| s.as_str())
        == Some("Начат");
    if open {
        let mut finished = record.clone().unwrap();
        finished["status_info"] = json!("Завершен");
        finished["end_geo"] = json!(fields.get("geo").cloned().unwrap_or_default());
        *record = Some(finished);
    } else {
        *record = Some(json!({
            "id": 1,
            "auditorium": fields.get("auditorium").cloned().unwrap_or_default(),
            "start_geo": fields.get("geo").cloned().unwrap_or_default(),
            "status_info": "Начат"
        }));
    }
    drop(record);

    *state.last_submission.lock().unwrap() = Some(fields);
    Json(json!({"status": "ok"})).into_response()
}

/// Spin up the mock portal on an ephemeral port.
pub async fn spawn_mock() -> MockPortal {
    let state = Arc::new(MockState::default());

    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/profile", get(profile))
        .route("/news", get(empty_list))
        .route("/tasks/my", get(empty_list))
        .route("/documents", get(empty_list))
        .route("/attendance/last", get(last_record))
        .route("/attendance/history", get(history))
        .route("/attendance", post(submit))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock portal");
    let addr = listener.local_addr().expect("mock portal has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock portal died");
    });

    MockPortal {
        base_url: format!("http://{}", addr),
        state,
    }
}

pub fn test_config(base_url: &str) -> Config {
    Config {
        base_url: base_url.to_string(),
        ..Config::default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Device stubs
// ─────────────────────────────────────────────────────────────────────────────

/// Programmable geolocator: reports a settable point, counts calls, and can
/// simulate a denied permission.
#[derive(Default)]
#[allow(dead_code)]
pub struct StubGeolocator {
    point: Mutex<Option<GeoPoint>>,
    pub deny: AtomicBool,
    pub locate_calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubGeolocator {
    pub fn at(point: GeoPoint) -> Self {
        Self {
            point: Mutex::new(Some(point)),
            ..Default::default()
        }
    }

    pub fn move_to(&self, point: GeoPoint) {
        *self.point.lock().unwrap() = Some(point);
    }
}

#[async_trait]
impl Geolocator for StubGeolocator {
    async fn locate(&self) -> Result<GeoPoint, DeviceError> {
        self.locate_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied);
        }
        (*self.point.lock().unwrap())
            .ok_or_else(|| DeviceError::Unavailable("no fix".to_string()))
    }
}

/// Programmable camera: returns a tiny JPEG-ish blob, counts calls, and can
/// simulate the user cancelling capture.
#[derive(Default)]
#[allow(dead_code)]
pub struct StubCamera {
    pub cancel: AtomicBool,
    pub capture_calls: AtomicUsize,
}

#[async_trait]
impl Camera for StubCamera {
    async fn capture(&self, _facing: CameraFacing) -> Result<Photo, DeviceError> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        if self.cancel.load(Ordering::SeqCst) {
            return Err(DeviceError::Cancelled);
        }
        Ok(Photo {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
            file_name: "selfie.jpg".to_string(),
            mime: "image/jpeg".to_string(),
        })
    }
}

/// Biometric stub that always passes the challenge.
#[allow(dead_code)]
pub struct StubBiometric {
    pub available: bool,
}

#[async_trait]
impl BiometricAuthenticator for StubBiometric {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn challenge(&self, _reason: &str) -> Result<(), DeviceError> {
        if self.available {
            Ok(())
        } else {
            Err(DeviceError::Unavailable("no biometric hardware".to_string()))
        }
    }
}
