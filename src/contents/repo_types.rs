use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Selects which table pair a content operation addresses. Registered and
/// guest callers get identical semantics over parallel schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    Registered,
    Guest,
}

impl OwnerKind {
    pub fn table(&self) -> &'static str {
        match self {
            OwnerKind::Registered => "contents",
            OwnerKind::Guest => "guestcontents",
        }
    }

    /// Screenshot files for guest rows carry a distinguishing prefix.
    pub fn shot_prefix(&self) -> &'static str {
        match self {
            OwnerKind::Registered => "",
            OwnerKind::Guest => "guest-",
        }
    }
}

/// A bookmarked URL with its captured screenshot and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ContentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub imageurl: String,
    pub genre: String,
    pub tags: String,
    pub title: String,
    pub overview: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
