//! Response types for the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub operator: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TargetResponse {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TargetFailureResponse {
    pub name: String,
    pub address: String,
    pub error: String,
}

/// Result of a control request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DispatchResponse {
    pub accepted: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub attempted: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<TargetFailureResponse>,
    /// Present when the command went out but was not recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuditEntryResponse {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_response_omits_empty_fields() {
        let response = DispatchResponse {
            accepted: true,
            message: "Shutdown command sent to ALL machines.".to_string(),
            action: Some("shutdown_all".to_string()),
            attempted: 2,
            failures: Vec::new(),
            audit_error: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("failures").is_none());
        assert!(json.get("audit_error").is_none());
        assert_eq!(json["attempted"], 2);
    }
}
