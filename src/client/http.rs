//! HTTP admin client.
//!
//! Sends the admin token as a bearer header and turns the server's structured
//! error body back into typed errors.

use super::{IntentionsApi, MessagesApi};
use crate::api::auth::ACTOR_HEADER;
use crate::error::{Error, FieldError, Result};
use crate::model::{IntentionMonth, MonthPayload, UnreadCount};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the parish REST API.
#[derive(Debug, Clone)]
pub struct AdminClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    actor: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(default)]
    fields: Vec<FieldError>,
}

impl AdminClient {
    /// Create a client for `base_url` (without trailing slash).
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the HTTP client cannot be built.
    pub fn new(base_url: &str, token: Option<String>, actor: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            actor: actor.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let mut request = request.header(ACTOR_HEADER, &self.actor);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &text))
    }

    /// Check that the server is up.
    ///
    /// # Errors
    ///
    /// Returns `Error::Network` if it is unreachable.
    pub async fn health(&self) -> Result<serde_json::Value> {
        self.send(self.client.get(self.url("/health"))).await
    }
}

/// Map a non-success response to an error.
fn error_from_response(status: StatusCode, body: &str) -> Error {
    if status == StatusCode::UNAUTHORIZED {
        return Error::Unauthorized;
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error }) if error.code == "VALIDATION_FAILED" && !error.fields.is_empty() => {
            Error::Validation(error.fields)
        }
        Ok(ErrorBody { error }) => Error::Api {
            status: status.as_u16(),
            code: error.code,
            message: error.message,
        },
        Err(_) => Error::Api {
            status: status.as_u16(),
            code: "HTTP_ERROR".to_string(),
            message: if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            },
        },
    }
}

impl IntentionsApi for AdminClient {
    async fn list_months(&self, year: i32) -> Result<Vec<IntentionMonth>> {
        self.send(
            self.client
                .get(self.url("/api/intentions"))
                .query(&[("year", year)]),
        )
        .await
    }

    async fn create_month(&self, payload: &MonthPayload) -> Result<IntentionMonth> {
        self.send(self.client.post(self.url("/api/intentions")).json(payload))
            .await
    }

    async fn update_month(&self, id: i64, payload: &MonthPayload) -> Result<IntentionMonth> {
        self.send(
            self.client
                .put(self.url(&format!("/api/intentions/{id}")))
                .json(payload),
        )
        .await
    }
}

impl MessagesApi for AdminClient {
    async fn unread_count(&self) -> Result<i64> {
        let count: UnreadCount = self
            .send(self.client.get(self.url("/api/messages/unread-count")))
            .await?;
        Ok(count.unread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = AdminClient::new("http://parish.local/", None, "admin").unwrap();
        assert_eq!(client.url("/health"), "http://parish.local/health");
    }

    #[test]
    fn test_unauthorized_maps_to_typed_error() {
        let err = error_from_response(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, Error::Unauthorized));
    }

    #[test]
    fn test_structured_body_is_parsed() {
        let body = r#"{"error":{"code":"MONTH_EXISTS","message":"Intentions for 2026-01 already exist","retryable":false}}"#;
        match error_from_response(StatusCode::CONFLICT, body) {
            Error::Api { status, code, message } => {
                assert_eq!(status, 409);
                assert_eq!(code, "MONTH_EXISTS");
                assert!(message.contains("2026-01"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_validation_fields_survive() {
        let body = r#"{"error":{"code":"VALIDATION_FAILED","message":"x","retryable":true,
            "fields":[{"field":"intentions[0].time","message":"must be a time in HH:MM format"}]}}"#;
        match error_from_response(StatusCode::BAD_REQUEST, body) {
            Error::Validation(fields) => assert_eq!(fields[0].field, "intentions[0].time"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_body() {
        let err = error_from_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.to_string().contains("upstream down"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) is closed on test machines.
        let client = AdminClient::new("http://127.0.0.1:9", None, "admin").unwrap();
        let err = client.list_months(2026).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
