//! API route handlers

pub mod actions;
pub mod audit;
pub mod auth;
pub mod error;
pub mod fleet;
pub mod session;
pub mod system;

use utoipa::OpenApi;

pub use error::AppError;

/// OpenAPI document for the daemon
#[derive(OpenApi)]
#[openapi(
    paths(
        session::login,
        session::logout,
        fleet::list_fleet,
        actions::perform_action,
        audit::recent_entries,
        system::health,
    ),
    components(schemas(
        labpower_api::requests::LoginRequest,
        labpower_api::requests::ActionRequestBody,
        labpower_api::responses::LoginResponse,
        labpower_api::responses::TargetResponse,
        labpower_api::responses::TargetFailureResponse,
        labpower_api::responses::DispatchResponse,
        labpower_api::responses::AuditEntryResponse,
        labpower_api::responses::ErrorResponse,
        labpower_api::responses::ErrorBody,
        labpower_api::responses::HealthResponse,
    )),
    tags((name = "labpower", description = "Lab power control"))
)]
pub struct ApiDoc;
