// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP gateway to the portal API.
//!
//! Every outbound request carries the session's current bearer token, read
//! fresh at send time. A 401 response triggers at most one silent
//! refresh-and-retry; that is the only automatic retry anywhere in the
//! client. Non-401 failures surface unchanged.

use crate::config::Config;
use crate::error::{PortalError, Result};
use crate::services::session::SessionController;
use reqwest::multipart;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Multipart form description that can rebuild the request body for the
/// single 401 retry (a `reqwest` form is consumed by sending).
#[derive(Debug, Clone, Default)]
pub struct FormData {
    parts: Vec<(String, FormValue)>,
}

#[derive(Debug, Clone)]
enum FormValue {
    Text(String),
    File {
        bytes: Vec<u8>,
        file_name: String,
        mime: String,
    },
}

impl FormData {
    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push((name.to_string(), FormValue::Text(value.into())));
        self
    }

    pub fn file(
        mut self,
        name: &str,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push((
            name.to_string(),
            FormValue::File {
                bytes,
                file_name: file_name.into(),
                mime: mime.into(),
            },
        ));
        self
    }

    fn to_form(&self) -> multipart::Form {
        let mut form = multipart::Form::new();
        for (name, value) in &self.parts {
            form = match value {
                FormValue::Text(text) => form.text(name.clone(), text.clone()),
                FormValue::File {
                    bytes,
                    file_name,
                    mime,
                } => {
                    let part = multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                    let part = match part.mime_str(mime) {
                        Ok(part) => part,
                        Err(_) => multipart::Part::bytes(bytes.clone()).file_name(file_name.clone()),
                    };
                    form.part(name.clone(), part)
                }
            };
        }
        form
    }
}

enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(FormData),
}

/// Authenticated portal API gateway.
#[derive(Clone)]
pub struct Gateway {
    /// Default client (~10 s timeout)
    http: reqwest::Client,
    /// Long-timeout client (~30 s) for image uploads
    upload: reqwest::Client,
    base_url: String,
    session: SessionController,
}

impl Gateway {
    pub fn new(config: &Config, session: SessionController) -> Result<Self> {
        let build = |timeout| {
            reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| PortalError::Internal(anyhow::anyhow!("http client init failed: {}", e)))
        };

        Ok(Self {
            http: build(config.request_timeout)?,
            upload: build(config.upload_timeout)?,
            base_url: config.base_url.clone(),
            session,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, &Body::Empty).await?;
        Self::parse_json(response).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let value = serde_json::to_value(body)
            .map_err(|e| PortalError::Internal(anyhow::anyhow!("request body: {}", e)))?;
        let response = self.send(Method::POST, path, &Body::Json(value)).await?;
        Self::parse_json(response).await
    }

    /// POST a multipart form (uses the long upload timeout).
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &FormData,
    ) -> Result<T> {
        let response = self
            .send(Method::POST, path, &Body::Multipart(form.clone()))
            .await?;
        Self::parse_json(response).await
    }

    /// Send a request, applying the 401 refresh-and-retry policy exactly once.
    async fn send(&self, method: Method, path: &str, body: &Body) -> Result<reqwest::Response> {
        let response = self.issue(method.clone(), path, body).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check(response).await;
        }

        // The request is now marked as retried: whatever happens below,
        // this path runs once.
        tracing::debug!(path, "401 from portal, attempting silent refresh");

        if !self.session.has_refresh_token().await {
            // Nothing to refresh with: clear the session and surface the
            // original error.
            let original = Self::response_error(response).await;
            self.session.logout().await;
            return Err(original);
        }

        // A failed refresh has already logged the session out; propagate
        // the refresh error rather than the original 401.
        self.session.refresh_access_token().await?;

        let retried = self.issue(method, path, body).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            // Still unauthorized with a fresh token: the session is gone.
            let err = Self::response_error(retried).await;
            tracing::warn!(path, "still unauthorized after refresh, forcing logout");
            self.session.logout().await;
            return Err(err);
        }
        Self::check(retried).await
    }

    /// Issue a single request with the current bearer token.
    async fn issue(&self, method: Method, path: &str, body: &Body) -> Result<reqwest::Response> {
        let client = match body {
            Body::Multipart(_) => &self.upload,
            _ => &self.http,
        };

        let url = format!("{}{}", self.base_url, path);
        let mut request = client.request(method, &url);

        // Read fresh: a refresh may have happened since this gateway was
        // constructed or since the previous request.
        if let Some(token) = self.session.access_token().await {
            request = request.bearer_auth(token);
        }

        let request = match body {
            Body::Empty => request,
            Body::Json(value) => request.json(value),
            Body::Multipart(form) => request.multipart(form.to_form()),
        };

        request.send().await.map_err(PortalError::from)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::response_error(response).await)
        }
    }

    async fn response_error(response: reqwest::Response) -> PortalError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        PortalError::api(status, &body)
    }

    async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| PortalError::Network(format!("JSON parse error: {}", e)))
    }
}
