//! Power control endpoint

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use labpower_api::requests::ActionRequestBody;
use labpower_api::responses::{DispatchResponse, TargetFailureResponse};
use labpower_core::{DispatchError, DispatchOutcome};

use crate::api::auth::Authenticated;
use crate::state::AppState;

/// Shut down or restart one machine or the whole fleet
#[utoipa::path(
    post,
    path = "/api/actions",
    request_body = ActionRequestBody,
    responses(
        (status = 200, description = "Commands issued", body = DispatchResponse),
        (status = 400, description = "Unknown action or missing target", body = DispatchResponse),
        (status = 401, description = "Login required"),
        (status = 404, description = "Target not in the fleet", body = DispatchResponse)
    )
)]
pub async fn perform_action(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    Json(req): Json<ActionRequestBody>,
) -> (StatusCode, Json<DispatchResponse>) {
    let outcome = state
        .dispatcher
        .perform(&req.action, req.target.as_deref(), &auth.operator.username)
        .await;

    (status_for(&outcome), Json(to_response(outcome)))
}

fn status_for(outcome: &DispatchOutcome) -> StatusCode {
    match &outcome.rejection {
        None => StatusCode::OK,
        Some(DispatchError::UnknownTarget(_)) => StatusCode::NOT_FOUND,
        Some(DispatchError::UnknownAction(_) | DispatchError::MissingTarget(_)) => {
            StatusCode::BAD_REQUEST
        }
    }
}

fn to_response(outcome: DispatchOutcome) -> DispatchResponse {
    DispatchResponse {
        accepted: outcome.accepted,
        message: outcome.message,
        action: outcome.kind.map(|k| k.as_str().to_string()),
        attempted: outcome.attempted,
        failures: outcome
            .failures
            .into_iter()
            .map(|f| TargetFailureResponse {
                name: f.target.name,
                address: f.target.address.to_string(),
                error: f.error.to_string(),
            })
            .collect(),
        audit_error: outcome.audit_error.map(|e| e.to_string()),
    }
}
