//! HTTP API server.
//!
//! Serves articles and their comment threads as JSON, plus the optional
//! front-end bundle for every non-API path.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/articles` | Article summaries |
//! | `POST` | `/api/articles` | Create an article |
//! | `GET`  | `/api/article/{article_id}` | One article |
//! | `GET`  | `/api/article/{article_id}/comments` | Flat comment list |
//! | `GET`  | `/api/article/{article_id}/nestedComments` | Reply tree |
//! | `POST` | `/api/article/{article_id}/comments` | Top-level comment, returns the reply tree |
//! | `POST` | `/api/article/{article_id}/comments/{comment_id}/comments` | Reply, returns the reply tree |
//! | `POST` | `/log` | Client-side error report |
//!
//! Any other path under `/api` is a 404.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "not found: article 42" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `conflict` (409),
//! `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use threadline_core::models::{
    Article, ArticleSummary, CommentNode, FlatComment, NewArticle, NewComment,
};
use threadline_core::store::Store;
use threadline_core::Error;

use crate::articles::{flat_comments, nested_comments};
use crate::config::Config;
use crate::seed::seed_if_empty;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

/// Open the store, seed it when empty, and serve until the process exits.
///
/// Binds to `[server].bind` (after any `PORT` override).
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let report = seed_if_empty(&store, config).await?;
    if !report.skipped {
        tracing::info!(
            articles = report.articles,
            comments = report.comments,
            "seeded database"
        );
    }

    let state = AppState {
        store: Arc::new(store),
    };
    let app = build_router(state, config.server.static_dir.clone());

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Assemble the full router. Exposed so tests can serve any store.
pub fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/articles", get(handle_list_articles).post(handle_create_article))
        .route("/article/{article_id}", get(handle_get_article))
        .route(
            "/article/{article_id}/comments",
            get(handle_flat_comments).post(handle_create_comment),
        )
        .route(
            "/article/{article_id}/nestedComments",
            get(handle_nested_comments),
        )
        .route(
            "/article/{article_id}/comments/{comment_id}/comments",
            post(handle_create_reply),
        )
        .fallback(handle_api_not_found);

    let mut app = Router::new()
        .route("/health", get(handle_health))
        .route("/log", post(handle_client_log))
        .nest("/api", api);

    if let Some(dir) = static_dir {
        // Unknown paths get index.html so client-side routes resolve.
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).fallback(index));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Malformed, mistyped or non-JSON request bodies.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Error::Integrity(_) | Error::Backend(_) => {
                tracing::error!(error = %err, "request failed");
                return AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal".to_string(),
                    message: "internal server error".to_string(),
                };
            }
        };
        AppError {
            status,
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Articles ============

async fn handle_list_articles(
    State(state): State<AppState>,
) -> Result<Json<Vec<ArticleSummary>>, AppError> {
    Ok(Json(state.store.list_articles().await?))
}

async fn handle_create_article(
    State(state): State<AppState>,
    payload: Result<Json<NewArticle>, JsonRejection>,
) -> Result<(StatusCode, Json<Article>), AppError> {
    let Json(input) = payload?;
    let article = state.store.create_article(input).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

async fn handle_get_article(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
) -> Result<Json<Article>, AppError> {
    Ok(Json(state.store.get_article(&article_id).await?))
}

// ============ Comments ============

/// Body of both comment-creating endpoints.
#[derive(Debug, Deserialize)]
struct CommentBody {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

async fn handle_flat_comments(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
) -> Result<Json<Vec<FlatComment>>, AppError> {
    Ok(Json(flat_comments(state.store.as_ref(), &article_id).await?))
}

async fn handle_nested_comments(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
) -> Result<Json<Vec<CommentNode>>, AppError> {
    Ok(Json(nested_comments(state.store.as_ref(), &article_id).await?))
}

async fn handle_create_comment(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    payload: Result<Json<CommentBody>, JsonRejection>,
) -> Result<Json<Vec<CommentNode>>, AppError> {
    let Json(body) = payload?;
    let input = NewComment {
        article_id: article_id.clone(),
        text: body.text.unwrap_or_default(),
        username: body.username,
        parent_id: None,
    };
    state.store.create_comment(input).await?;
    Ok(Json(nested_comments(state.store.as_ref(), &article_id).await?))
}

async fn handle_create_reply(
    State(state): State<AppState>,
    Path((article_id, comment_id)): Path<(String, String)>,
    payload: Result<Json<CommentBody>, JsonRejection>,
) -> Result<Json<Vec<CommentNode>>, AppError> {
    let Json(body) = payload?;
    // A parent on another article is addressed through the wrong URL.
    state.store.get_article(&article_id).await?;
    state.store.get_comment(&article_id, &comment_id).await?;

    let input = NewComment {
        article_id: article_id.clone(),
        text: body.text.unwrap_or_default(),
        username: body.username,
        parent_id: Some(comment_id),
    };
    state.store.create_comment(input).await?;
    Ok(Json(nested_comments(state.store.as_ref(), &article_id).await?))
}

// ============ Misc ============

async fn handle_api_not_found() -> AppError {
    not_found("no such API endpoint")
}

async fn handle_client_log(Json(report): Json<serde_json::Value>) -> StatusCode {
    tracing::error!(report = %report, "client reported error");
    StatusCode::OK
}
