//! Contact form messages.
//!
//! Anyone may post a message; reading, marking and deleting them is admin
//! only. The admin panel polls `unread-count` for its badge.

use super::auth::AdminAuth;
use super::extract::{Params, Payload};
use super::AppState;
use crate::error::Result;
use crate::model::{ContactMessage, ContactMessageInput, UnreadCount};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/messages", get(list_messages).post(create_message))
        .route("/api/messages/unread-count", get(unread_count))
        .route("/api/messages/:id/read", post(mark_read))
        .route("/api/messages/:id", delete(delete_message))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MessageQuery {
    pub unread: bool,
}

async fn create_message(
    State(state): State<AppState>,
    Payload(input): Payload<ContactMessageInput>,
) -> Result<(StatusCode, Json<ContactMessage>)> {
    let message = state.storage()?.create_message(&input)?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_messages(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Params(query): Params<MessageQuery>,
) -> Result<Json<Vec<ContactMessage>>> {
    Ok(Json(state.storage()?.list_messages(query.unread)?))
}

async fn unread_count(State(state): State<AppState>, _admin: AdminAuth) -> Result<Json<UnreadCount>> {
    let unread = state.storage()?.unread_count()?;
    Ok(Json(UnreadCount { unread }))
}

async fn mark_read(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<i64>,
) -> Result<Json<ContactMessage>> {
    Ok(Json(state.storage()?.mark_message_read(id, &admin.actor)?))
}

async fn delete_message(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.storage()?.delete_message(id, &admin.actor)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    fn message() -> serde_json::Value {
        json!({
            "name": "Maria",
            "email": "maria@example.org",
            "subject": "Wedding",
            "message": "Is June 14 free?"
        })
    }

    #[tokio::test]
    async fn test_public_post_admin_read() {
        let (app, _) = app();
        let (status, created) = send(&app, Method::POST, "/api/messages", Some(message()), false).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["is_read"], false);

        let (status, _) = send(&app, Method::GET, "/api/messages", None, false).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, list) = send(&app, Method::GET, "/api/messages", None, true).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unread_count_and_mark_read() {
        let (app, _) = app();
        let (_, first) = send(&app, Method::POST, "/api/messages", Some(message()), false).await;
        send(&app, Method::POST, "/api/messages", Some(message()), false).await;

        let (_, count) = send(&app, Method::GET, "/api/messages/unread-count", None, true).await;
        assert_eq!(count["unread"], 2);

        let uri = format!("/api/messages/{}/read", first["id"]);
        let (status, read) = send(&app, Method::POST, &uri, None, true).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(read["is_read"], true);

        let (_, count) = send(&app, Method::GET, "/api/messages/unread-count", None, true).await;
        assert_eq!(count["unread"], 1);

        let (_, unread) = send(&app, Method::GET, "/api/messages?unread=true", None, true).await;
        assert_eq!(unread.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_email_rejected() {
        let (app, _) = app();
        let mut body = message();
        body["email"] = json!("not-an-email");
        let (status, body) = send(&app, Method::POST, "/api/messages", Some(body), false).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["fields"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_delete_missing_message() {
        let (app, _) = app();
        let (status, _) = send(&app, Method::DELETE, "/api/messages/5", None, true).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
