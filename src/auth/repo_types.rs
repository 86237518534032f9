use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Registered user created on first federated login.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub usertype: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Password account. `password_hash` stays NULL until the signup token is
/// redeemed via `/auth/pwregist`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BasicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Anonymous identity row, one per guest login. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GuestUser {
    pub id: Uuid,
    pub token: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
