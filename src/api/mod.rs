//! REST API.
//!
//! One route group per content type, each handler a thin mapping from
//! verb and path to a storage call. Reads are public; writes (and a few
//! admin-only reads) require the bearer token checked by [`auth::AdminAuth`].
//!
//! The server holds a single [`SqliteStorage`] behind a mutex. Each request
//! locks it for one synchronous storage call.

pub mod about;
pub mod auth;
pub mod content;
pub mod extract;
pub mod intentions;
pub mod messages;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method, Request};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    storage: Arc<Mutex<SqliteStorage>>,
    pub(crate) admin_digest: Option<[u8; 32]>,
}

impl AppState {
    /// Build the state. Without an admin token every admin route answers 401.
    #[must_use]
    pub fn new(storage: Arc<Mutex<SqliteStorage>>, admin_token: Option<&str>) -> Self {
        Self {
            storage,
            admin_digest: admin_token.map(auth::token_digest),
        }
    }

    pub(crate) fn storage(&self) -> Result<MutexGuard<'_, SqliteStorage>> {
        self.storage
            .lock()
            .map_err(|_| Error::Other("storage lock poisoned".to_string()))
    }
}

/// Generates UUID v4 request ids for `x-request-id`.
#[derive(Clone, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Build the application router.
///
/// # Errors
///
/// Returns `Error::Config` if `cors_origin` is not a valid header value.
pub fn router(state: AppState, cors_origin: Option<&str>) -> Result<Router> {
    let mut app = Router::new()
        .route("/health", get(health))
        .merge(intentions::routes())
        .merge(content::routes())
        .merge(messages::routes())
        .merge(about::routes())
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<axum::body::Body>| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    if let Some(origin) = cors_origin {
        let origin: HeaderValue = origin
            .parse()
            .map_err(|e| Error::Config(format!("Invalid CORS origin '{origin}': {e}")))?;
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([
                    AUTHORIZATION,
                    CONTENT_TYPE,
                    HeaderName::from_static(auth::ACTOR_HEADER),
                ]),
        );
    }

    Ok(app.with_state(state))
}

/// Run the server until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(
    storage: SqliteStorage,
    settings: &Settings,
    shutdown: CancellationToken,
) -> Result<()> {
    if settings.admin_token.is_none() {
        warn!("No admin token configured; admin routes will answer 401");
    }

    let state = AppState::new(
        Arc::new(Mutex::new(storage)),
        settings.admin_token.as_deref(),
    );
    let app = router(state, settings.cors_origin.as_deref())?;

    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    info!(addr = %settings.bind, "Parish API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Parish API stopped");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let (status, body) = send(&app, Method::GET, "/health", None, false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_request_id_is_set() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_wrong_token_is_unauthorized() {
        let (app, _) = app();
        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/messages")
            .header(AUTHORIZATION, "Bearer nope")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_no_configured_token_rejects_admin() {
        let storage = Arc::new(Mutex::new(SqliteStorage::open_memory().unwrap()));
        let app = router(AppState::new(storage, None), None).unwrap();
        let (status, body) = send(&app, Method::GET, "/api/messages", None, true).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[test]
    fn test_invalid_cors_origin() {
        let storage = Arc::new(Mutex::new(SqliteStorage::open_memory().unwrap()));
        let result = router(AppState::new(storage, None), Some("bad\norigin"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
