//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, OpenSessionRequest, OpenSessionResponse,
};
use super::AppState;
use crate::bootstrap::{self, BootstrapError, DocumentLocator};
use crate::runtime::{SessionSnapshot, WorkspaceEvent};
use crate::state_machine::TransitionError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session (transcript, annotated document, request state)
        .route("/api/session", get(get_session).post(open_session))
        // User instructions
        .route("/api/chat", post(send_chat))
        // Rendering surface
        .route("/api/preview", get(get_preview))
        .route("/api/stream", get(stream_session))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session
// ============================================================

async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.coordinator.snapshot().await)
}

async fn open_session(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<OpenSessionResponse>), AppError> {
    let locator = match (req.url, req.content, req.content_base64) {
        (Some(url), None, None) => DocumentLocator::Url(url),
        (None, Some(content), None) => DocumentLocator::Inline(content),
        (None, None, Some(encoded)) => DocumentLocator::Base64(encoded),
        _ => {
            return Err(AppError::BadRequest(
                "Provide exactly one of url, content or content_base64".to_string(),
            ))
        }
    };

    let base_text = bootstrap::resolve(&locator, &state.http).await?;
    let base_length = base_text.len();
    state.coordinator.open_session(base_text).await;

    let request_id = match req.instruction.filter(|i| !i.trim().is_empty()) {
        Some(instruction) => Some(
            state
                .coordinator
                .submit(instruction, vec![])
                .await?
                .request_id,
        ),
        None => None,
    };

    Ok((
        StatusCode::CREATED,
        Json(OpenSessionResponse {
            base_length,
            request_id,
        }),
    ))
}

// ============================================================
// User Actions
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<(StatusCode, Json<ChatResponse>), AppError> {
    let ticket = state.coordinator.submit(req.text, req.attachments).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ChatResponse {
            request_id: ticket.request_id,
        }),
    ))
}

// ============================================================
// Rendering surface
// ============================================================

async fn get_preview(State(state): State<AppState>) -> Html<String> {
    Html(state.coordinator.annotated().await)
}

async fn stream_session(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before the snapshot so no update falls between them
    let broadcast_rx = state.coordinator.subscribe();
    let snapshot = state.coordinator.snapshot().await;

    let init_event = WorkspaceEvent::Init {
        last_sequence_id: snapshot.last_sequence_id(),
        session: serde_json::to_value(&snapshot).unwrap_or(Value::Null),
    };

    sse_stream(init_event, broadcast_rx)
}

async fn get_version() -> &'static str {
    concat!("localizer ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Conflict(String),
    BadGateway(String),
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::InvalidInput => AppError::BadRequest(e.to_string()),
            TransitionError::RequestInProgress | TransitionError::StaleResponse(_) => {
                AppError::Conflict(e.to_string())
            }
        }
    }
}

impl From<BootstrapError> for AppError {
    fn from(e: BootstrapError) -> Self {
        match e {
            BootstrapError::Fetch { .. } | BootstrapError::Status { .. } => {
                AppError::BadGateway(e.to_string())
            }
            BootstrapError::Read { .. }
            | BootstrapError::Decode(_)
            | BootstrapError::NotUtf8(_)
            | BootstrapError::Empty => AppError::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangeRecord;
    use crate::proposal::{Proposal, ProposalSource};
    use crate::runtime::testing::{GatedProposalSource, MockProposalSource};
    use crate::runtime::RequestCoordinator;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    fn app(source: Arc<dyn ProposalSource>, base: &str) -> (Router, AppState) {
        let (tx, _) = broadcast::channel(64);
        let state = AppState::new(
            RequestCoordinator::new(source, base, tx),
            reqwest::Client::new(),
        );
        (create_router(state.clone()), state)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_is_accepted_and_answered() {
        let mock = Arc::new(MockProposalSource::new());
        let change = ChangeRecord::modification("h1", "organisation", "organization").unwrap();
        mock.queue_response(Proposal {
            content: "Updated.".into(),
            changes: vec![change],
            ..Proposal::default()
        });
        let (router, state) = app(mock, "<h1>Welcome to our organisation</h1>");

        let response = router
            .oneshot(post_json("/api/chat", &serde_json::json!({"text": "Localize"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert!(body["request_id"].is_string());

        // Wait for the background proposal to land
        let mut rx = state.coordinator.subscribe();
        while state.coordinator.snapshot().await.messages.len() < 2 {
            let _ = rx.recv().await;
        }
        assert!(state.coordinator.annotated().await.contains("organization"));
    }

    #[tokio::test]
    async fn test_blank_chat_is_bad_request() {
        let (router, state) = app(Arc::new(MockProposalSource::new()), "doc");

        let response = router
            .oneshot(post_json("/api/chat", &serde_json::json!({"text": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Instruction is empty");
        assert!(state.coordinator.snapshot().await.messages.is_empty());
    }

    #[tokio::test]
    async fn test_chat_while_pending_is_conflict() {
        let gated = Arc::new(GatedProposalSource::new(Proposal::text("done")));
        let (router, state) = app(gated.clone(), "doc");

        state.coordinator.submit("first", vec![]).await.unwrap();
        let response = router
            .oneshot(post_json("/api/chat", &serde_json::json!({"text": "second"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(state.coordinator.snapshot().await.messages.len(), 1);
        gated.release();
    }

    #[tokio::test]
    async fn test_open_session_with_inline_content() {
        let (router, state) = app(Arc::new(MockProposalSource::new()), "old");

        let response = router
            .oneshot(post_json(
                "/api/session",
                &serde_json::json!({"content": "<p>new</p>"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["base_length"], 10);
        assert!(body.get("request_id").is_none());
        assert_eq!(state.coordinator.annotated().await, "<p>new</p>");
    }

    #[tokio::test]
    async fn test_open_session_with_instruction_submits() {
        let gated = Arc::new(GatedProposalSource::new(Proposal::text("done")));
        let (router, state) = app(gated.clone(), "old");

        let response = router
            .oneshot(post_json(
                "/api/session",
                &serde_json::json!({"content": "<p>colour</p>", "instruction": "Localize"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(body_json(response).await["request_id"].is_string());

        let snapshot = state.coordinator.snapshot().await;
        assert!(snapshot.state.is_pending());
        assert_eq!(snapshot.messages[0].content, "Localize");
        gated.release();
    }

    #[tokio::test]
    async fn test_open_session_requires_one_source() {
        let (router, _) = app(Arc::new(MockProposalSource::new()), "old");

        let response = router
            .clone()
            .oneshot(post_json("/api/session", &serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(post_json(
                "/api/session",
                &serde_json::json!({"content": "a", "url": "http://example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_open_session_rejects_bad_upload() {
        let (router, _) = app(Arc::new(MockProposalSource::new()), "old");

        let response = router
            .oneshot(post_json(
                "/api/session",
                &serde_json::json!({"content_base64": "%%%"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_preview_and_session_views() {
        let (router, _) = app(Arc::new(MockProposalSource::new()), "<p>hello</p>");

        let response = router
            .clone()
            .oneshot(Request::get("/api/preview").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"<p>hello</p>");

        let response = router
            .oneshot(Request::get("/api/session").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["state"]["type"], "idle");
        assert_eq!(body["base_document"], "<p>hello</p>");
        assert_eq!(body["messages"], serde_json::json!([]));
    }

    #[test]
    fn test_transition_error_status_mapping() {
        let status = |e: TransitionError| AppError::from(e).into_response().status();
        assert_eq!(status(TransitionError::InvalidInput), StatusCode::BAD_REQUEST);
        assert_eq!(status(TransitionError::RequestInProgress), StatusCode::CONFLICT);
    }
}
