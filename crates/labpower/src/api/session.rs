//! Login and logout

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use labpower_api::requests::LoginRequest;
use labpower_api::responses::LoginResponse;

use crate::api::auth::Authenticated;
use crate::api::error::AppError;
use crate::state::AppState;

/// Exchange operator credentials for a session token
///
/// # Errors
/// Returns 401 for unknown users or wrong passwords
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = labpower_api::responses::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let session = state.gate.login(&req.username, &req.password).await?;

    Ok(Json(LoginResponse {
        token: session.token,
        operator: session.operator.username,
        expires_at: session.expires_at,
    }))
}

/// Revoke the caller's session
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 204, description = "Session revoked"))
)]
pub async fn logout(State(state): State<Arc<AppState>>, auth: Authenticated) -> StatusCode {
    state.gate.logout(&auth.token).await;
    StatusCode::NO_CONTENT
}
