use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contents::repo_types::ContentRecord;

/// User-submitted bookmark fields, shared by create and edit.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentSubmission {
    pub url: String,
    pub genre: String,
    pub tags: String,
    pub title: String,
    pub overview: String,
}

/// Body for `POST /app/registContents` and its guest twin.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistRequest {
    pub contents_info: ContentSubmission,
}

/// Body for `PUT /app/editContents` and its guest twin.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub contents_id: Uuid,
    pub contents_info: ContentSubmission,
}

/// Everything the "my page" view needs in one response.
#[derive(Debug, Serialize)]
pub struct ContentsPage {
    pub username: String,
    pub contents: Vec<ContentRecord>,
}
