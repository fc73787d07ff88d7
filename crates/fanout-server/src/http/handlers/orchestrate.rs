//! Orchestration handler.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, warn};

use fanout_core::OrchestrationRequest;

use crate::http::responses::{ErrorResponse, OrchestrateRequest, OrchestrateResponse};
use crate::state::AppState;

/// Fan a prompt out to `agent_count` agents and return the run report.
///
/// Requests are validated before anything touches the workspace store. The
/// run itself executes in its own task; if the client goes away the run is
/// cancelled and its report is still assembled and logged.
pub async fn orchestrate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<OrchestrateRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected malformed orchestration request");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let request = match OrchestrationRequest::new(&body.prompt, body.agent_count) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, agent_count = body.agent_count, "Rejected orchestration request");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    info!(
        agent_count = request.agent_count(),
        prompt_len = request.prompt().len(),
        "Received orchestration request"
    );

    let cancel = state.shutdown.child_token();
    let disconnect_guard = cancel.clone().drop_guard();
    let run_state = state.clone();
    let result = tokio::spawn(async move {
        run_state.orchestrator.orchestrate(&request, cancel).await
    })
    .await;
    disconnect_guard.disarm();

    match result {
        Ok(Ok(report)) => (StatusCode::OK, Json(OrchestrateResponse::from(report))).into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "Orchestration failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!(error = %e, "Orchestration task died");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Orchestration task failed".to_string(),
            )
        }
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}
