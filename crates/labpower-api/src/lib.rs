//! labpower-api: Shared API types and schemas
//!
//! Contains request/response types and OpenAPI schema definitions
//! used across the daemon, client and CLI.

pub mod requests;
pub mod responses;

/// Header carrying the session token when no `Authorization` header is sent
pub const SESSION_HEADER: &str = "x-session-token";
