//! Routes for announcements, the mass schedule, clergy, history, events and
//! the gallery.
//!
//! Collections are public to read. Creating, updating and deleting needs the
//! admin token.

use super::auth::AdminAuth;
use super::extract::{Params, Payload};
use super::AppState;
use crate::error::{Error, Result};
use crate::model::{
    Announcement, AnnouncementInput, ClergyInput, ClergyMember, Event, EventInput,
    GalleryCategory, GalleryCategoryInput, GalleryImage, GalleryImageInput, HistoryEntry,
    HistoryEntryInput, MassTime, MassTimeInput,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

/// Generates `get`, `create`, `update` and `delete` handlers for one content
/// type, each a single storage call.
macro_rules! item_handlers {
    ($module:ident, $record:ty, $input:ty, $get:ident, $create:ident, $update:ident, $delete:ident) => {
        mod $module {
            use super::*;

            pub async fn get_one(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<$record>> {
                Ok(Json(state.storage()?.$get(id)?))
            }

            pub async fn create(
                State(state): State<AppState>,
                admin: AdminAuth,
                Payload(input): Payload<$input>,
            ) -> Result<(StatusCode, Json<$record>)> {
                let record = state.storage()?.$create(&input, &admin.actor)?;
                Ok((StatusCode::CREATED, Json(record)))
            }

            pub async fn update(
                State(state): State<AppState>,
                admin: AdminAuth,
                Path(id): Path<i64>,
                Payload(input): Payload<$input>,
            ) -> Result<Json<$record>> {
                Ok(Json(state.storage()?.$update(id, &input, &admin.actor)?))
            }

            pub async fn delete(
                State(state): State<AppState>,
                admin: AdminAuth,
                Path(id): Path<i64>,
            ) -> Result<StatusCode> {
                state.storage()?.$delete(id, &admin.actor)?;
                Ok(StatusCode::NO_CONTENT)
            }
        }
    };
}

item_handlers!(announcement, Announcement, AnnouncementInput, get_announcement, create_announcement, update_announcement, delete_announcement);
item_handlers!(mass_time, MassTime, MassTimeInput, get_mass_time, create_mass_time, update_mass_time, delete_mass_time);
item_handlers!(clergy, ClergyMember, ClergyInput, get_clergy, create_clergy, update_clergy, delete_clergy);
item_handlers!(history, HistoryEntry, HistoryEntryInput, get_history_entry, create_history_entry, update_history_entry, delete_history_entry);
item_handlers!(event, Event, EventInput, get_event, create_event, update_event, delete_event);
item_handlers!(category, GalleryCategory, GalleryCategoryInput, get_gallery_category, create_gallery_category, update_gallery_category, delete_gallery_category);
item_handlers!(image, GalleryImage, GalleryImageInput, get_gallery_image, create_gallery_image, update_gallery_image, delete_gallery_image);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/announcements", get(list_announcements).post(announcement::create))
        .route(
            "/api/announcements/:id",
            get(announcement::get_one).put(announcement::update).delete(announcement::delete),
        )
        .route("/api/mass-times", get(list_mass_times).post(mass_time::create))
        .route(
            "/api/mass-times/:id",
            get(mass_time::get_one).put(mass_time::update).delete(mass_time::delete),
        )
        .route("/api/clergy", get(list_clergy).post(clergy::create))
        .route(
            "/api/clergy/:id",
            get(clergy::get_one).put(clergy::update).delete(clergy::delete),
        )
        .route("/api/history", get(list_history).post(history::create))
        .route(
            "/api/history/:id",
            get(history::get_one).put(history::update).delete(history::delete),
        )
        .route("/api/events", get(list_events).post(event::create))
        .route(
            "/api/events/:id",
            get(event::get_one).put(event::update).delete(event::delete),
        )
        .route("/api/gallery/categories", get(list_categories).post(category::create))
        .route(
            "/api/gallery/categories/:id",
            get(category::get_one).put(category::update).delete(category::delete),
        )
        .route("/api/gallery/images", get(list_images).post(image::create))
        .route(
            "/api/gallery/images/:id",
            get(image::get_one).put(image::update).delete(image::delete),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnnouncementQuery {
    /// Include unpublished announcements (admin only).
    pub all: bool,
}

async fn list_announcements(
    State(state): State<AppState>,
    admin: Option<AdminAuth>,
    Params(query): Params<AnnouncementQuery>,
) -> Result<Json<Vec<Announcement>>> {
    if query.all && admin.is_none() {
        return Err(Error::Unauthorized);
    }
    Ok(Json(state.storage()?.list_announcements(query.all)?))
}

async fn list_mass_times(State(state): State<AppState>) -> Result<Json<Vec<MassTime>>> {
    Ok(Json(state.storage()?.list_mass_times()?))
}

async fn list_clergy(State(state): State<AppState>) -> Result<Json<Vec<ClergyMember>>> {
    Ok(Json(state.storage()?.list_clergy()?))
}

async fn list_history(State(state): State<AppState>) -> Result<Json<Vec<HistoryEntry>>> {
    Ok(Json(state.storage()?.list_history()?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EventQuery {
    /// Only events from today on.
    pub upcoming: bool,
}

async fn list_events(
    State(state): State<AppState>,
    Params(query): Params<EventQuery>,
) -> Result<Json<Vec<Event>>> {
    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    let from = query.upcoming.then_some(today.as_str());
    Ok(Json(state.storage()?.list_events(from)?))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<GalleryCategory>>> {
    Ok(Json(state.storage()?.list_gallery_categories()?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    pub category_id: Option<i64>,
}

async fn list_images(
    State(state): State<AppState>,
    Params(query): Params<ImageQuery>,
) -> Result<Json<Vec<GalleryImage>>> {
    Ok(Json(state.storage()?.list_gallery_images(query.category_id)?))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_announcement_visibility() {
        let (app, _) = app();
        for (title, published) in [("Visible", true), ("Draft", false)] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/api/announcements",
                Some(json!({
                    "title": title,
                    "content": "Text",
                    "publish_date": "2026-01-04",
                    "is_published": published
                })),
                true,
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, public) = send(&app, Method::GET, "/api/announcements", None, false).await;
        assert_eq!(public.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, Method::GET, "/api/announcements?all=true", None, false).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, all) = send(&app, Method::GET, "/api/announcements?all=true", None, true).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mass_time_crud() {
        let (app, _) = app();
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/mass-times",
            Some(json!({"day_of_week": 0, "time": "09:30", "description": "Sung mass"})),
            true,
        )
        .await;
        let uri = format!("/api/mass-times/{}", created["id"]);

        let (status, updated) = send(
            &app,
            Method::PUT,
            &uri,
            Some(json!({"day_of_week": 0, "time": "10:00"})),
            true,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["time"], "10:00");
        assert!(updated["description"].is_null());

        let (status, _) = send(&app, Method::DELETE, &uri, None, true).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, Method::GET, &uri, None, false).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "CONTENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_gallery_category_filter() {
        let (app, _) = app();
        let (_, category) = send(
            &app,
            Method::POST,
            "/api/gallery/categories",
            Some(json!({"name": "Pilgrimage 2025"})),
            true,
        )
        .await;
        let category_id = category["id"].as_i64().unwrap();

        for category in [json!(category_id), json!(null)] {
            send(
                &app,
                Method::POST,
                "/api/gallery/images",
                Some(json!({
                    "title": "Photo",
                    "image_url": "https://example.org/p.jpg",
                    "category_id": category
                })),
                true,
            )
            .await;
        }

        let (_, filtered) = send(
            &app,
            Method::GET,
            &format!("/api/gallery/images?category_id={category_id}"),
            None,
            false,
        )
        .await;
        assert_eq!(filtered.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, Method::GET, "/api/gallery/images?category_id=abc", None, false).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_clergy_validation() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/clergy",
            Some(json!({"name": "Fr. Jan", "role": "", "photo_url": "javascript:alert(1)"})),
            true,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["fields"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_history_and_events_are_public() {
        let (app, _) = app();
        send(
            &app,
            Method::POST,
            "/api/history",
            Some(json!({"year": 1654, "title": "Founding", "content": "The first church."})),
            true,
        )
        .await;
        send(
            &app,
            Method::POST,
            "/api/events",
            Some(json!({"title": "Parish picnic", "event_date": "2099-06-01", "event_time": "12:00"})),
            true,
        )
        .await;

        let (_, history) = send(&app, Method::GET, "/api/history", None, false).await;
        assert_eq!(history[0]["year"], 1654);
        let (_, upcoming) = send(&app, Method::GET, "/api/events?upcoming=true", None, false).await;
        assert_eq!(upcoming.as_array().unwrap().len(), 1);
    }
}
