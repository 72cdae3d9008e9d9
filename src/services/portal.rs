// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Thin typed reads over the peripheral portal endpoints.
//!
//! Profile, news, tasks and documents are plain pass-throughs: one GET
//! each, explicit response shapes, no client-side logic.

use crate::error::Result;
use crate::services::gateway::Gateway;
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: u64,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub patronymic: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsItem {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub published_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskItem {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentItem {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDate>,
}

/// Read-only access to the CRUD-ish portal endpoints.
#[derive(Clone)]
pub struct PortalService {
    gateway: Gateway,
}

impl PortalService {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn profile(&self) -> Result<Profile> {
        self.gateway.get_json("/profile").await
    }

    pub async fn news(&self) -> Result<Vec<NewsItem>> {
        self.gateway.get_json("/news").await
    }

    pub async fn my_tasks(&self) -> Result<Vec<TaskItem>> {
        self.gateway.get_json("/tasks/my").await
    }

    pub async fn documents(&self) -> Result<Vec<DocumentItem>> {
        self.gateway.get_json("/documents").await
    }
}
