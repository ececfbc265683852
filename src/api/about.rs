//! `/api/about` singleton sections ("parish", "patron", "office-hours", ...).

use super::auth::AdminAuth;
use super::extract::Payload;
use super::AppState;
use crate::error::Result;
use crate::model::{AboutSection, AboutSectionInput};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/about", get(list_sections))
        .route("/api/about/:key", get(get_section).put(put_section))
}

async fn list_sections(State(state): State<AppState>) -> Result<Json<Vec<AboutSection>>> {
    Ok(Json(state.storage()?.list_about_sections()?))
}

async fn get_section(State(state): State<AppState>, Path(key): Path<String>) -> Result<Json<AboutSection>> {
    Ok(Json(state.storage()?.get_about_section(&key)?))
}

async fn put_section(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(key): Path<String>,
    Payload(input): Payload<AboutSectionInput>,
) -> Result<Json<AboutSection>> {
    Ok(Json(
        state
            .storage()?
            .upsert_about_section(&key, &input, &admin.actor)?,
    ))
}
