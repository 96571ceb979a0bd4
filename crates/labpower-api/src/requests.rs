//! Request types for the API

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// A control request: one of `shutdown_one`, `restart_one`, `shutdown_all`, `restart_all`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActionRequestBody {
    pub action: String,
    /// Target address, required by the single-target actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl ActionRequestBody {
    pub fn one(action: &str, target: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            target: Some(target.into()),
        }
    }

    pub fn all(action: &str) -> Self {
        Self {
            action: action.to_string(),
            target: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AuditQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}
