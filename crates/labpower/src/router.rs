//! HTTP router configuration

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post},
};
use utoipa::OpenApi;

use crate::api::{ApiDoc, actions, audit, fleet, session, system};
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // System endpoints
        .route("/health", get(system::health))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        // Session
        .route("/api/login", post(session::login))
        .route("/api/logout", post(session::logout))
        // Power control
        .route("/api/fleet", get(fleet::list_fleet))
        .route("/api/actions", post(actions::perform_action))
        .route("/api/audit", get(audit::recent_entries))
        // State
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use labpower_core::{AuditLog, Dispatcher, FileAuditLog, Fleet, OperatorConfig, SessionGate};
    use labpower_exec::{ExecError, HostAddr, PowerAction, PowerExecutor, Target};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    #[derive(Default)]
    struct CountingExecutor {
        calls: Mutex<Vec<(String, PowerAction)>>,
    }

    #[async_trait]
    impl PowerExecutor for CountingExecutor {
        async fn execute(&self, target: &Target, action: PowerAction) -> Result<(), ExecError> {
            self.calls
                .lock()
                .unwrap()
                .push((target.address.to_string(), action));
            Ok(())
        }

        fn executor_type(&self) -> &'static str {
            "counting"
        }
    }

    struct Harness {
        app: Router,
        executor: Arc<CountingExecutor>,
        audit: Arc<FileAuditLog>,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        async fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let audit = Arc::new(FileAuditLog::open(dir.path().join("lab_actions.log")).await.unwrap());
            let executor = Arc::new(CountingExecutor::default());

            let fleet = Fleet::new([
                Target::new("A", HostAddr::parse("10.0.0.1").unwrap()),
                Target::new("B", HostAddr::parse("10.0.0.2").unwrap()),
            ])
            .unwrap();
            let dispatcher = Dispatcher::new(Arc::new(fleet), executor.clone(), audit.clone());

            let operators = vec![OperatorConfig {
                username: "op1".to_string(),
                password_hash: SessionGate::hash_password("lab123").unwrap(),
            }];
            let gate = SessionGate::new(&operators, std::time::Duration::from_secs(60)).unwrap();

            let state = Arc::new(AppState::new(dispatcher, gate, audit.clone()));

            Self {
                app: create_router(state),
                executor,
                audit,
                _dir: dir,
            }
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, body)
        }

        async fn login(&self) -> String {
            let (status, body) = self
                .send(json_request(
                    "POST",
                    "/api/login",
                    None,
                    json!({"username": "op1", "password": "lab123"}),
                ))
                .await;
            assert_eq!(status, StatusCode::OK);
            body["token"].as_str().unwrap().to_string()
        }

        fn calls(&self) -> usize {
            self.executor.calls.lock().unwrap().len()
        }
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(labpower_api::SESSION_HEADER, token);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let harness = Harness::new().await;
        let (status, body) = harness.send(get_request("/health", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_action_without_session_is_denied() {
        let harness = Harness::new().await;

        let (status, body) = harness
            .send(json_request(
                "POST",
                "/api/actions",
                None,
                json!({"action": "shutdown_all"}),
            ))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _) = harness
            .send(json_request(
                "POST",
                "/api/actions",
                Some("forged-token"),
                json!({"action": "shutdown_all"}),
            ))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        assert_eq!(harness.calls(), 0);
        assert!(harness.audit.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_login() {
        let harness = Harness::new().await;
        let (status, _) = harness
            .send(json_request(
                "POST",
                "/api/login",
                None,
                json!({"username": "op1", "password": "nope"}),
            ))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_restart_all_is_dispatched_and_audited() {
        let harness = Harness::new().await;
        let token = harness.login().await;

        let (status, body) = harness
            .send(json_request(
                "POST",
                "/api/actions",
                Some(&token),
                json!({"action": "restart_all"}),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], true);
        assert_eq!(body["message"], "Restart command sent to ALL machines.");
        assert_eq!(harness.calls(), 2);

        let (status, body) = harness
            .send(get_request("/api/audit?limit=10", Some(&token)))
            .await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["actor"], "op1");
        assert_eq!(entries[0]["action"], "restart_all");
        assert_eq!(entries[0]["target"], "ALL");
    }

    #[tokio::test]
    async fn test_rejections_map_to_status_codes() {
        let harness = Harness::new().await;
        let token = harness.login().await;

        let cases = [
            (json!({"action": "format_disks"}), StatusCode::BAD_REQUEST),
            (json!({"action": "shutdown_one"}), StatusCode::BAD_REQUEST),
            (
                json!({"action": "shutdown_one", "target": "10.0.0.9"}),
                StatusCode::NOT_FOUND,
            ),
            (
                json!({"action": "shutdown_one", "target": "10.0.0.1; rm -rf /"}),
                StatusCode::NOT_FOUND,
            ),
        ];

        for (request, expected) in cases {
            let (status, body) = harness
                .send(json_request("POST", "/api/actions", Some(&token), request))
                .await;
            assert_eq!(status, expected);
            assert_eq!(body["accepted"], false);
        }

        assert_eq!(harness.calls(), 0);
        assert!(harness.audit.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fleet_and_logout() {
        let harness = Harness::new().await;
        let token = harness.login().await;

        let (status, body) = harness.send(get_request("/api/fleet", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"name": "A", "address": "10.0.0.1"},
                {"name": "B", "address": "10.0.0.2"}
            ])
        );

        let (status, _) = harness
            .send(json_request("POST", "/api/logout", Some(&token), json!({})))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = harness.send(get_request("/api/fleet", Some(&token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
