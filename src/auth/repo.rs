use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{BasicUser, GuestUser, User};

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, usertype, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn create(db: &PgPool, name: &str, email: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, usertype)
            VALUES ($1, $2, 'general')
            RETURNING id, name, email, usertype, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Refresh the stored display name from the provider profile.
    pub async fn update_name(db: &PgPool, id: Uuid, name: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, usertype, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}

impl BasicUser {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<BasicUser>> {
        let user = sqlx::query_as::<_, BasicUser>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM basicusers
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Pending account created on signup, before the password is set.
    pub async fn create_pending(db: &PgPool, name: &str, email: &str) -> anyhow::Result<BasicUser> {
        let user = sqlx::query_as::<_, BasicUser>(
            r#"
            INSERT INTO basicusers (name, email)
            VALUES ($1, $2)
            RETURNING id, name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE basicusers
            SET password_hash = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Compensating delete when the setup mail cannot be sent.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM basicusers WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

impl GuestUser {
    pub async fn create(db: &PgPool, token: &str) -> anyhow::Result<GuestUser> {
        let guest = sqlx::query_as::<_, GuestUser>(
            r#"
            INSERT INTO guestusers (token)
            VALUES ($1)
            RETURNING id, token, created_at, updated_at
            "#,
        )
        .bind(token)
        .fetch_one(db)
        .await?;
        Ok(guest)
    }
}
