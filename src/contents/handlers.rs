use std::path::Path as FsPath;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::{GuestCaller, SessionUser},
    contents::{
        dto::{ContentsPage, EditRequest, RegistRequest},
        repo_types::{ContentRecord, OwnerKind},
        services::{self, ContentError},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/getContents", get(get_contents))
        .route("/registContents", post(regist_contents))
        .route("/editContents", put(edit_contents))
        .route("/deleteContents/:id", delete(delete_contents))
        .route("/guestGetContents", get(guest_get_contents))
        .route("/guestRegistContents", post(guest_regist_contents))
        .route("/guestEditContents", put(guest_edit_contents))
        .route("/guestDeleteContents/:id", delete(guest_delete_contents))
        .route("/images/:name", get(get_image))
}

fn content_error(e: ContentError) -> (StatusCode, String) {
    match e {
        ContentError::NotFound => (StatusCode::NOT_FOUND, e.to_string()),
        ContentError::Other(e) => (StatusCode::BAD_REQUEST, e.to_string()),
    }
}

// --- registered users ---

#[instrument(skip(state, user))]
async fn get_contents(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Json<ContentsPage>, (StatusCode, String)> {
    let contents = services::read(&state, OwnerKind::Registered, user.id)
        .await
        .map_err(content_error)?;
    Ok(Json(ContentsPage {
        username: user.name.unwrap_or_default(),
        contents,
    }))
}

#[instrument(skip(state, user, payload))]
async fn regist_contents(
    State(state): State<AppState>,
    user: SessionUser,
    Json(payload): Json<RegistRequest>,
) -> Result<Json<ContentRecord>, (StatusCode, String)> {
    let record = services::create(&state, OwnerKind::Registered, user.id, payload.contents_info)
        .await
        .map_err(content_error)?;
    Ok(Json(record))
}

#[instrument(skip(state, user, payload))]
async fn edit_contents(
    State(state): State<AppState>,
    user: SessionUser,
    Json(payload): Json<EditRequest>,
) -> Result<Json<ContentRecord>, (StatusCode, String)> {
    let record = services::update(
        &state,
        OwnerKind::Registered,
        user.id,
        payload.contents_id,
        payload.contents_info,
    )
    .await
    .map_err(content_error)?;
    Ok(Json(record))
}

#[instrument(skip(state, user))]
async fn delete_contents(
    State(state): State<AppState>,
    user: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ContentRecord>, (StatusCode, String)> {
    let record = services::delete(&state, OwnerKind::Registered, user.id, id)
        .await
        .map_err(content_error)?;
    Ok(Json(record))
}

// --- guests ---

#[instrument(skip(state))]
async fn guest_get_contents(
    State(state): State<AppState>,
    GuestCaller(guest_id): GuestCaller,
) -> Result<Json<ContentsPage>, (StatusCode, String)> {
    let contents = services::read(&state, OwnerKind::Guest, guest_id)
        .await
        .map_err(content_error)?;
    Ok(Json(ContentsPage {
        username: "Guest".into(),
        contents,
    }))
}

#[instrument(skip(state, payload))]
async fn guest_regist_contents(
    State(state): State<AppState>,
    GuestCaller(guest_id): GuestCaller,
    Json(payload): Json<RegistRequest>,
) -> Result<Json<ContentRecord>, (StatusCode, String)> {
    let record = services::create(&state, OwnerKind::Guest, guest_id, payload.contents_info)
        .await
        .map_err(content_error)?;
    Ok(Json(record))
}

#[instrument(skip(state, payload))]
async fn guest_edit_contents(
    State(state): State<AppState>,
    GuestCaller(guest_id): GuestCaller,
    Json(payload): Json<EditRequest>,
) -> Result<Json<ContentRecord>, (StatusCode, String)> {
    let record = services::update(
        &state,
        OwnerKind::Guest,
        guest_id,
        payload.contents_id,
        payload.contents_info,
    )
    .await
    .map_err(content_error)?;
    Ok(Json(record))
}

#[instrument(skip(state))]
async fn guest_delete_contents(
    State(state): State<AppState>,
    GuestCaller(guest_id): GuestCaller,
    Path(id): Path<Uuid>,
) -> Result<Json<ContentRecord>, (StatusCode, String)> {
    let record = services::delete(&state, OwnerKind::Guest, guest_id, id)
        .await
        .map_err(content_error)?;
    Ok(Json(record))
}

// --- images ---

const PLACEHOLDER: &str = "noimage.png";

/// Shot names never contain path separators; anything else is someone
/// probing the filesystem.
fn safe_image_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}

fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

/// Serves a stored screenshot, falling back to the placeholder image when
/// the file is missing.
#[instrument(skip(state))]
async fn get_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !safe_image_name(&name) {
        return Err((StatusCode::BAD_REQUEST, "invalid image name".into()));
    }

    let shots_dir = FsPath::new(&state.config.shots_dir);
    let (bytes, file_name) = match tokio::fs::read(shots_dir.join(&name)).await {
        Ok(b) => (b, name),
        Err(e) => {
            warn!(error = %e, image = %name, "shot missing, serving placeholder");
            let placeholder = tokio::fs::read(shots_dir.join(PLACEHOLDER))
                .await
                .map_err(|_| (StatusCode::NOT_FOUND, "image not found".to_string()))?;
            (placeholder, PLACEHOLDER.to_string())
        }
    };

    Ok((
        [(header::CONTENT_TYPE, content_type_for(&file_name))],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_name_sanitization() {
        assert!(safe_image_name("img-1-20240101.jpeg"));
        assert!(safe_image_name("noimage.png"));
        assert!(!safe_image_name(""));
        assert!(!safe_image_name("../secret"));
        assert!(!safe_image_name("a/b.jpeg"));
        assert!(!safe_image_name("a\\b.jpeg"));
    }

    #[test]
    fn content_errors_map_to_status() {
        let (status, message) = content_error(ContentError::NotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "content not found");

        let (status, _) = content_error(ContentError::Other(anyhow::anyhow!("boom")));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type_for("x.png"), "image/png");
        assert_eq!(content_type_for("x.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("x.jpg"), "image/jpeg");
    }
}
