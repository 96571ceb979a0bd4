//! Audit log read-back

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use labpower_api::requests::AuditQuery;
use labpower_api::responses::AuditEntryResponse;

use crate::api::auth::Authenticated;
use crate::api::error::AppError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 1000;

/// Newest audit entries, oldest first
///
/// # Errors
/// Returns 500 if the log cannot be read
#[utoipa::path(
    get,
    path = "/api/audit",
    params(("limit" = Option<usize>, Query, description = "Maximum entries to return")),
    responses((status = 200, description = "Recent entries", body = [AuditEntryResponse]))
)]
pub async fn recent_entries(
    State(state): State<Arc<AppState>>,
    _auth: Authenticated,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntryResponse>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let entries = state
        .audit
        .recent(limit)
        .await?
        .into_iter()
        .map(|e| AuditEntryResponse {
            timestamp: e.timestamp,
            actor: e.actor,
            action: e.action,
            target: e.target_description,
        })
        .collect();

    Ok(Json(entries))
}
