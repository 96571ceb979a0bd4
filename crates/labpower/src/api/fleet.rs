//! Fleet listing

use std::sync::Arc;

use axum::{Json, extract::State};
use labpower_api::responses::TargetResponse;

use crate::api::auth::Authenticated;
use crate::state::AppState;

/// List the controllable machines
#[utoipa::path(
    get,
    path = "/api/fleet",
    responses((status = 200, description = "Configured targets", body = [TargetResponse]))
)]
pub async fn list_fleet(
    State(state): State<Arc<AppState>>,
    _auth: Authenticated,
) -> Json<Vec<TargetResponse>> {
    let targets = state
        .dispatcher
        .fleet()
        .targets()
        .iter()
        .map(|t| TargetResponse {
            name: t.name.clone(),
            address: t.address.to_string(),
        })
        .collect();

    Json(targets)
}
