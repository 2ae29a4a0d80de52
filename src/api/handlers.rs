//! HTTP request handlers

use super::assets::serve_static;
use super::render::render_page;
use super::types::{
    ChatErrorResponse, ChatForm, ChatRequest, HealthResponse, TranscriptResponse,
};
use super::AppState;
use crate::conversation::{SubmitError, SubmitOutcome, Turn};
use crate::session::SessionLookup;
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::{headers::Cookie, TypedHeader};
use serde_json::json;
use tower_http::trace::TraceLayer;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "daisy_session";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat page and its form
        .route("/", get(serve_chat_page))
        .route("/chat", post(submit_form))
        // JSON API
        .route("/api/transcript", get(get_transcript))
        .route("/api/chat", post(submit_json))
        // Static assets (embedded or filesystem fallback)
        .route("/assets/*path", get(serve_static))
        .route("/healthz", get(healthz))
        .route("/version", get(get_version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================
// Sessions
// ============================================================

type MaybeCookie = Option<TypedHeader<Cookie>>;

async fn resolve_session(state: &AppState, cookie: &MaybeCookie) -> SessionLookup {
    let id = cookie
        .as_ref()
        .and_then(|TypedHeader(c)| c.get(SESSION_COOKIE));
    state.sessions.get_or_create(id).await
}

/// `Set-Cookie` header for a freshly minted session
fn session_headers(lookup: &SessionLookup) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if lookup.created {
        let cookie = format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
            lookup.id
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.insert(header::SET_COOKIE, value);
        }
    }
    headers
}

// ============================================================
// Chat page
// ============================================================

async fn serve_chat_page(State(state): State<AppState>, cookie: MaybeCookie) -> Response {
    let lookup = resolve_session(&state, &cookie).await;
    let html = {
        let mut session = lookup.handle.lock().await;
        // No-op unless the transcript is empty
        session.conversation.initialize();
        let error = session.take_flash_error();
        render_page(
            &state.page,
            session.conversation.transcript().turns(),
            error.as_deref(),
        )
    };
    (session_headers(&lookup), Html(html)).into_response()
}

async fn submit_form(
    State(state): State<AppState>,
    cookie: MaybeCookie,
    Form(form): Form<ChatForm>,
) -> Response {
    let lookup = resolve_session(&state, &cookie).await;
    {
        let mut session = lookup.handle.lock().await;
        let result = session
            .conversation
            .submit(state.model.as_ref(), &form.prompt)
            .await;
        if let Err(e) = result {
            log_submit_error(&lookup.id, &e);
            session.set_flash_error(e.to_string());
        }
    }
    (session_headers(&lookup), Redirect::to("/")).into_response()
}

// ============================================================
// JSON API
// ============================================================

async fn get_transcript(State(state): State<AppState>, cookie: MaybeCookie) -> Response {
    let lookup = resolve_session(&state, &cookie).await;
    let turns = lookup.handle.lock().await.conversation.transcript().turns().to_vec();
    (session_headers(&lookup), Json(TranscriptResponse { turns })).into_response()
}

async fn submit_json(
    State(state): State<AppState>,
    cookie: MaybeCookie,
    Json(req): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let lookup = resolve_session(&state, &cookie).await;
    let mut session = lookup.handle.lock().await;

    match session
        .conversation
        .submit(state.model.as_ref(), &req.text)
        .await
    {
        Ok(outcome) => {
            if outcome == SubmitOutcome::Ignored {
                tracing::debug!(session = %lookup.id, "Ignored blank submission");
            }
            let turns = session.conversation.transcript().turns().to_vec();
            Ok((session_headers(&lookup), Json(TranscriptResponse { turns })).into_response())
        }
        Err(e) => {
            log_submit_error(&lookup.id, &e);
            Err(AppError::Upstream {
                message: e.to_string(),
                turns: session.conversation.transcript().turns().to_vec(),
                headers: session_headers(&lookup),
            })
        }
    }
}

fn log_submit_error(session_id: &str, error: &SubmitError) {
    tracing::warn!(session = %session_id, error = %error, "Submission failed");
}

// ============================================================
// Probes
// ============================================================

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        model: state.model.model_id().to_string(),
    })
}

async fn get_version() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    /// The remote model call failed; the transcript still holds the user turn
    Upstream {
        message: String,
        turns: Vec<Turn>,
        headers: HeaderMap,
    },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Upstream {
                message,
                turns,
                headers,
            } => (
                StatusCode::BAD_GATEWAY,
                headers,
                Json(ChatErrorResponse {
                    error: message,
                    turns,
                }),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockChatModel;
    use crate::llm::LlmError;
    use crate::session::SessionStore;
    use crate::system_prompt::{GREETING, PAGE};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(mock: Arc<MockChatModel>) -> (Router, Arc<SessionStore>) {
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(3600)));
        let state = AppState::new(sessions.clone(), mock, PAGE);
        (create_router(state), sessions)
    }

    fn session_cookie(response: &Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie set")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    fn json_chat(cookie: &str, text: &str) -> Request<Body> {
        Request::post("/api/chat")
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "text": text }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_visit_sets_cookie_and_shows_greeting() {
        let (app, sessions) = app(Arc::new(MockChatModel::new("mock")));
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);
        assert!(cookie.starts_with("daisy_session="));

        let html = body_string(response).await;
        assert!(html.contains("<strong>Daisy B2B Connector</strong>"));
        assert!(html.contains("class=\"turn assistant\""));
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_json_chat_flow() {
        let mock = Arc::new(MockChatModel::new("mock"));
        mock.queue_reply("R1");
        mock.queue_reply("R2");
        let (app, _) = app(mock.clone());

        let first = app
            .clone()
            .oneshot(Request::get("/api/transcript").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = session_cookie(&first);
        let initial = body_json(first).await;
        assert_eq!(initial["turns"].as_array().unwrap().len(), 1);
        assert_eq!(initial["turns"][0]["text"], GREETING);

        let response = app
            .clone()
            .oneshot(json_chat(&cookie, "John Doe, ABC Realty, zip 90210, tribe A"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = body_json(response).await;
        assert_eq!(body["turns"].as_array().unwrap().len(), 3);
        assert_eq!(body["turns"][2]["speaker"], "assistant");
        assert_eq!(body["turns"][2]["text"], "R1");

        let response = app.oneshot(json_chat(&cookie, "A")).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["turns"].as_array().unwrap().len(), 5);
        assert_eq!(mock.started_histories()[1].len(), 3);
    }

    #[tokio::test]
    async fn test_json_chat_failure_returns_bad_gateway_with_user_turn() {
        let mock = Arc::new(MockChatModel::new("mock"));
        mock.queue_error(LlmError::server_error("Server error: overloaded"));
        let (app, _) = app(mock);

        let first = app
            .clone()
            .oneshot(Request::get("/api/transcript").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = session_cookie(&first);

        let response = app.oneshot(json_chat(&cookie, "hello")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "An error occurred: Server error: overloaded");
        let turns = body["turns"].as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1]["speaker"], "user");
    }

    #[tokio::test]
    async fn test_blank_json_chat_is_ignored() {
        let mock = Arc::new(MockChatModel::new("mock"));
        let (app, _) = app(mock.clone());

        let response = app.oneshot(json_chat("daisy_session=none", "   ")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["turns"].as_array().unwrap().len(), 1);
        assert!(mock.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn test_form_failure_flashes_error_once() {
        let mock = Arc::new(MockChatModel::new("mock"));
        mock.queue_error(LlmError::auth("Authentication failed: API key not valid"));
        let (app, _) = app(mock);

        let first = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = session_cookie(&first);

        let response = app
            .clone()
            .oneshot(
                Request::post("/chat")
                    .header(header::COOKIE, &cookie)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("prompt=Jane+Roe%2C+XYZ+Homes"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");

        let page = |app: Router| {
            let cookie = cookie.clone();
            async move {
                let response = app
                    .oneshot(
                        Request::get("/")
                            .header(header::COOKIE, cookie)
                            .body(Body::empty())
                            .unwrap(),
                    )
                    .await
                    .unwrap();
                body_string(response).await
            }
        };

        let html = page(app.clone()).await;
        assert!(html.contains("API key not valid"));
        assert!(html.contains("Jane Roe, XYZ Homes"));
        assert!(html.contains("class=\"turn user\""));

        let html = page(app).await;
        assert!(!html.contains("role=\"alert\""));
        assert!(html.contains("Jane Roe, XYZ Homes"));
    }

    #[tokio::test]
    async fn test_stylesheet_and_probes() {
        let (app, _) = app(Arc::new(MockChatModel::new("mock-model")));

        let css = app
            .clone()
            .oneshot(Request::get("/assets/style.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(css.status(), StatusCode::OK);
        assert_eq!(css.headers().get(header::CONTENT_TYPE).unwrap(), "text/css");

        let missing = app
            .clone()
            .oneshot(Request::get("/assets/nope.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let health = app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(health).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["model"], "mock-model");
    }
}
