//! Shared types for the API layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clinical::ClinicalApiService;

/// Shared state for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub clinical: Arc<ClinicalApiService>,
    pub started_at: DateTime<Utc>,
}

impl ApiContext {
    pub fn new(clinical: Arc<ClinicalApiService>) -> Self {
        Self {
            clinical,
            started_at: Utc::now(),
        }
    }
}

/// Success envelope: `{success: true, message?, data, cached?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
            cached: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn cached(mut self, cached: bool) -> Self {
        self.cached = Some(cached);
        self
    }
}
