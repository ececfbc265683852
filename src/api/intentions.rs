//! `/api/intentions` routes.
//!
//! Reads are public (the website shows the month's intentions). Writes
//! always carry a whole month: `PUT` replaces every intention of the month,
//! which is also how a single intention is removed.

use super::auth::AdminAuth;
use super::extract::{Params, Payload};
use super::AppState;
use crate::error::Result;
use crate::model::{IntentionMonth, MonthPayload};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/intentions", get(list_months).post(create_month))
        .route(
            "/api/intentions/:id",
            get(get_month).put(replace_month).delete(delete_month),
        )
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
}

async fn list_months(
    State(state): State<AppState>,
    Params(query): Params<MonthQuery>,
) -> Result<Json<Vec<IntentionMonth>>> {
    Ok(Json(state.storage()?.list_intention_months(query.year)?))
}

async fn get_month(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<IntentionMonth>> {
    state
        .storage()?
        .get_intention_month(id)?
        .map(Json)
        .ok_or(crate::error::Error::MonthNotFound { id })
}

async fn create_month(
    State(state): State<AppState>,
    admin: AdminAuth,
    Payload(payload): Payload<MonthPayload>,
) -> Result<(StatusCode, Json<IntentionMonth>)> {
    let month = state.storage()?.create_intention_month(&payload, &admin.actor)?;
    Ok((StatusCode::CREATED, Json(month)))
}

async fn replace_month(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<i64>,
    Payload(payload): Payload<MonthPayload>,
) -> Result<Json<IntentionMonth>> {
    Ok(Json(
        state
            .storage()?
            .replace_intention_month(id, &payload, &admin.actor)?,
    ))
}

async fn delete_month(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.storage()?.delete_intention_month(id, &admin.actor)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    fn january(intentions: serde_json::Value) -> serde_json::Value {
        json!({"year": 2026, "month": 1, "intentions": intentions})
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let (app, _) = app();
        let body = january(json!([
            {"date": "2026-01-04", "time": "08:00", "intention": "For the parish"}
        ]));

        let (status, created) = send(&app, Method::POST, "/api/intentions", Some(body), true).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["intentions"][0]["intention"], "For the parish");
        assert!(created["intentions"][0]["id"].as_i64().unwrap() > 0);

        let (status, list) = send(&app, Method::GET, "/api/intentions?year=2026", None, false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (_, other_year) = send(&app, Method::GET, "/api/intentions?year=2025", None, false).await;
        assert!(other_year.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_create_conflicts() {
        let (app, _) = app();
        send(&app, Method::POST, "/api/intentions", Some(january(json!([]))), true).await;
        let (status, body) =
            send(&app, Method::POST, "/api/intentions", Some(january(json!([]))), true).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "MONTH_EXISTS");
    }

    #[tokio::test]
    async fn test_put_replaces_all() {
        let (app, _) = app();
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/intentions",
            Some(january(json!([
                {"date": "2026-01-04", "time": "08:00", "intention": "A"},
                {"date": "2026-01-05", "time": "08:00", "intention": "B"}
            ]))),
            true,
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, replaced) = send(
            &app,
            Method::PUT,
            &format!("/api/intentions/{id}"),
            Some(january(json!([
                {"date": "2026-01-05", "time": "08:00", "intention": "B"}
            ]))),
            true,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replaced["intentions"].as_array().unwrap().len(), 1);
        assert_eq!(replaced["intentions"][0]["intention"], "B");
    }

    #[tokio::test]
    async fn test_put_missing_is_404() {
        let (app, _) = app();
        let (status, body) =
            send(&app, Method::PUT, "/api/intentions/99", Some(january(json!([]))), true).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "MONTH_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_validation_reports_fields() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/intentions",
            Some(january(json!([
                {"date": "2026-02-01", "time": "8am", "intention": "<b></b>"}
            ]))),
            true,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields: Vec<_> = body["error"]["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            fields,
            vec![
                "intentions[0].date",
                "intentions[0].time",
                "intentions[0].intention"
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_structured() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/intentions",
            Some(json!({"year": "soon"})),
            true,
        )
        .await;
        assert!(status.is_client_error());
        assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_writes_need_token() {
        let (app, _) = app();
        let (status, _) =
            send(&app, Method::POST, "/api/intentions", Some(january(json!([]))), false).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, Method::DELETE, "/api/intentions/1", None, false).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_delete_month() {
        let (app, _) = app();
        let (_, created) =
            send(&app, Method::POST, "/api/intentions", Some(january(json!([]))), true).await;
        let uri = format!("/api/intentions/{}", created["id"]);

        let (status, _) = send(&app, Method::DELETE, &uri, None, true).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &uri, None, false).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
