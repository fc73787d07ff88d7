//! HTTP server for the orchestrator.
//!
//! Provides endpoints for:
//! - Orchestration (`POST /orchestrate`)

use std::sync::Arc;

use axum::{routing::post, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer for the front-end
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/orchestrate", post(handlers::orchestrate))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::responses::{ErrorResponse, OrchestrateResponse};
    use crate::runner::testing::{Script, ScriptedRunner};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use fanout_core::AgentStatus;
    use serde_json::Value;
    use std::path::Path;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn router(root: &Path, runner: ScriptedRunner) -> Router {
        let config = Arc::new(Config {
            workspace_root: root.to_path_buf(),
            agent_timeout: Duration::from_secs(30),
            ..Config::default()
        });
        create_router(AppState::new(config, Arc::new(runner)))
    }

    fn router_with_shutdown(
        root: &Path,
        runner: Arc<ScriptedRunner>,
        shutdown: CancellationToken,
    ) -> Router {
        let config = Arc::new(Config {
            workspace_root: root.to_path_buf(),
            agent_timeout: Duration::from_secs(30),
            ..Config::default()
        });
        create_router(AppState::with_shutdown(config, runner, shutdown))
    }

    /// Wait until every agent has started and only `still_running` remain.
    async fn wait_for_agents(runner: &ScriptedRunner, started: usize, still_running: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while runner.requests().len() < started || runner.running() != still_running {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/orchestrate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_orchestrate_success() {
        let store = tempfile::tempdir().unwrap();
        let app = router(store.path(), ScriptedRunner::new());

        let (status, body) = send(app, post_json(r#"{"prompt":"write docs","agent_count":3}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["summary"]["total_agents"], 3);
        assert_eq!(body["summary"]["successful"], 3);
        assert_eq!(body["summary"]["failed"], 0);
        assert_eq!(body["run_info"]["git_initialized"], true);
        assert_eq!(body["results"][1]["agent_id"], 2);
        assert_eq!(body["results"][1]["workspace"]["branch_name"], "agent-2");
        assert!(body["results"][0].get("error").is_none());

        let parsed: OrchestrateResponse = serde_json::from_value(body).unwrap();
        let run_dir = Path::new(&parsed.report.run_info.run_dir);
        assert!(run_dir.starts_with(store.path().canonicalize().unwrap().join("runs")));
        assert!(run_dir.join("worktrees").join("agent-3").is_dir());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_agent_keeps_status_completed() {
        let store = tempfile::tempdir().unwrap();
        let app = router(store.path(), ScriptedRunner::new().script(2, Script::Hang));

        let (status, body) = send(app, post_json(r#"{"prompt":"task","agent_count":3}"#)).await;

        assert_eq!(status, StatusCode::OK);
        let parsed: OrchestrateResponse = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(parsed.report.summary.successful, 2);
        assert_eq!(parsed.report.summary.failed, 1);
        assert_eq!(parsed.report.results[1].status, AgentStatus::Failed);
        assert!(body["results"][1]["error"].as_str().unwrap().starts_with("timeout"));
        assert_eq!(body["status"], "completed");
    }

    #[tokio::test]
    async fn test_shutdown_cancels_running_agents() {
        let store = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().script(2, Script::Hang));
        let shutdown = CancellationToken::new();
        let app = router_with_shutdown(store.path(), runner.clone(), shutdown.clone());

        let request = tokio::spawn(send(app, post_json(r#"{"prompt":"task","agent_count":2}"#)));
        wait_for_agents(&runner, 2, 1).await;
        shutdown.cancel();
        let (status, body) = request.await.unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["results"][0]["status"], "success");
        assert_eq!(body["results"][0]["output"], "agent 1 done");
        assert_eq!(body["results"][1]["status"], "failed");
        let error = body["results"][1]["error"].as_str().unwrap();
        assert!(error.starts_with("cancelled"), "{}", error);
        assert_eq!(runner.running(), 0);
    }

    #[tokio::test]
    async fn test_client_disconnect_stops_agents() {
        let store = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            ScriptedRunner::new()
                .script(2, Script::Hang)
                .script(3, Script::Hang),
        );
        let shutdown = CancellationToken::new();
        let app = router_with_shutdown(store.path(), runner.clone(), shutdown.clone());

        let request = tokio::spawn(app.oneshot(post_json(r#"{"prompt":"task","agent_count":3}"#)));
        wait_for_agents(&runner, 3, 2).await;

        // Dropping the in-flight response future is what a disconnect does.
        request.abort();
        assert!(request.await.unwrap_err().is_cancelled());

        wait_for_agents(&runner, 3, 0).await;
        assert!(!shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_agent_count_out_of_range_creates_nothing() {
        let store = tempfile::tempdir().unwrap();

        for count in [0, 11, -1] {
            let app = router(store.path(), ScriptedRunner::new());
            let body = format!(r#"{{"prompt":"task","agent_count":{}}}"#, count);
            let (status, body) = send(app, post_json(&body)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            let error: ErrorResponse = serde_json::from_value(body).unwrap();
            assert!(error.error.contains("between 1 and 10"), "{}", error.error);
        }
        assert!(!store.path().join("runs").exists());
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let store = tempfile::tempdir().unwrap();

        for payload in [r#"{"prompt":"   ","agent_count":2}"#, r#"{"agent_count":2}"#] {
            let app = router(store.path(), ScriptedRunner::new());
            let (status, body) = send(app, post_json(payload)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Prompt is required");
        }
        assert!(!store.path().join("runs").exists());
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let store = tempfile::tempdir().unwrap();

        for payload in ["{not json", r#"{"prompt":"x","agent_count":"3"}"#] {
            let app = router(store.path(), ScriptedRunner::new());
            let (status, body) = send(app, post_json(payload)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].is_string());
        }
        assert!(!store.path().join("runs").exists());
    }

    #[tokio::test]
    async fn test_agent_count_defaults_to_one() {
        let store = tempfile::tempdir().unwrap();
        let app = router(store.path(), ScriptedRunner::new());

        let (status, body) = send(app, post_json(r#"{"prompt":"task"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["total_agents"], 1);
    }

    #[tokio::test]
    async fn test_runner_not_ready_is_server_error() {
        let store = tempfile::tempdir().unwrap();
        let app = router(store.path(), ScriptedRunner::new().not_ready());

        let (status, body) = send(app, post_json(r#"{"prompt":"task","agent_count":1}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("not ready"));
        assert!(!store.path().join("runs").exists());
    }

    #[tokio::test]
    async fn test_get_not_allowed() {
        let store = tempfile::tempdir().unwrap();
        let app = router(store.path(), ScriptedRunner::new());

        let response = app
            .oneshot(Request::builder().uri("/orchestrate").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
