use sqlx::PgPool;
use uuid::Uuid;

use crate::contents::dto::ContentSubmission;
use crate::contents::repo_types::{ContentRecord, OwnerKind};

const COLUMNS: &str = "id, user_id, url, imageurl, genre, tags, title, overview, created_at, updated_at";

pub async fn insert(
    db: &PgPool,
    kind: OwnerKind,
    owner_id: Uuid,
    submission: &ContentSubmission,
    imageurl: &str,
) -> anyhow::Result<ContentRecord> {
    let sql = format!(
        r#"
        INSERT INTO {table} (user_id, url, imageurl, genre, tags, title, overview)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "#,
        table = kind.table(),
    );
    let record = sqlx::query_as::<_, ContentRecord>(&sql)
        .bind(owner_id)
        .bind(&submission.url)
        .bind(imageurl)
        .bind(&submission.genre)
        .bind(&submission.tags)
        .bind(&submission.title)
        .bind(&submission.overview)
        .fetch_one(db)
        .await?;
    Ok(record)
}

pub async fn list_by_owner(
    db: &PgPool,
    kind: OwnerKind,
    owner_id: Uuid,
) -> anyhow::Result<Vec<ContentRecord>> {
    let sql = format!(
        r#"
        SELECT {COLUMNS}
        FROM {table}
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
        table = kind.table(),
    );
    let rows = sqlx::query_as::<_, ContentRecord>(&sql)
        .bind(owner_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

/// Lookup scoped by id AND owner; a row owned by someone else is
/// indistinguishable from a missing one.
pub async fn find_scoped(
    db: &PgPool,
    kind: OwnerKind,
    content_id: Uuid,
    owner_id: Uuid,
) -> anyhow::Result<Option<ContentRecord>> {
    let sql = format!(
        r#"
        SELECT {COLUMNS}
        FROM {table}
        WHERE id = $1 AND user_id = $2
        "#,
        table = kind.table(),
    );
    let row = sqlx::query_as::<_, ContentRecord>(&sql)
        .bind(content_id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Answers `None` when the scoped row has vanished since it was looked up.
pub async fn update_fields(
    db: &PgPool,
    kind: OwnerKind,
    content_id: Uuid,
    owner_id: Uuid,
    submission: &ContentSubmission,
    imageurl: &str,
) -> anyhow::Result<Option<ContentRecord>> {
    let sql = format!(
        r#"
        UPDATE {table}
        SET url = $3, imageurl = $4, genre = $5, tags = $6, title = $7,
            overview = $8, updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING {COLUMNS}
        "#,
        table = kind.table(),
    );
    let record = sqlx::query_as::<_, ContentRecord>(&sql)
        .bind(content_id)
        .bind(owner_id)
        .bind(&submission.url)
        .bind(imageurl)
        .bind(&submission.genre)
        .bind(&submission.tags)
        .bind(&submission.title)
        .bind(&submission.overview)
        .fetch_optional(db)
        .await?;
    Ok(record)
}

pub async fn delete_scoped(
    db: &PgPool,
    kind: OwnerKind,
    content_id: Uuid,
    owner_id: Uuid,
) -> anyhow::Result<()> {
    let sql = format!(
        r#"DELETE FROM {table} WHERE id = $1 AND user_id = $2"#,
        table = kind.table(),
    );
    sqlx::query(&sql)
        .bind(content_id)
        .bind(owner_id)
        .execute(db)
        .await?;
    Ok(())
}
