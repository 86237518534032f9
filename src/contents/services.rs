use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::contents::dto::ContentSubmission;
use crate::contents::repo;
use crate::contents::repo_types::{ContentRecord, OwnerKind};
use crate::screenshot::remove_shot_best_effort;
use crate::state::AppState;

/// Failures the handlers distinguish: a scoped lookup miss versus
/// everything else.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("content not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

static SHOT_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second]");

/// Tag separators come in as spaces from the client and are stored
/// comma-joined.
pub fn normalize_tags(tags: &str) -> String {
    tags.replace(' ', ",")
}

/// Deterministic shot name from owner id and capture time, e.g.
/// `img-<owner>-20240131120000.jpeg` (guest rows prefix `guest-`).
pub fn shot_file_name(
    kind: OwnerKind,
    owner_id: Uuid,
    now: OffsetDateTime,
) -> anyhow::Result<String> {
    let stamp = now.format(SHOT_TIME_FORMAT)?;
    Ok(format!("{}img-{}-{}.jpeg", kind.shot_prefix(), owner_id, stamp))
}

fn image_url(state: &AppState, shot_name: &str) -> String {
    format!("{}/app/images/{}", state.config.server_origin, shot_name)
}

/// File name component of a stored image URL.
fn shot_name_of(imageurl: &str) -> &str {
    imageurl.rsplit('/').next().unwrap_or(imageurl)
}

/// Inserts the row and captures the screenshot concurrently; either
/// failing fails the whole call. A shot file written before a failed
/// insert is not cleaned up.
pub async fn create(
    state: &AppState,
    kind: OwnerKind,
    owner_id: Uuid,
    mut submission: ContentSubmission,
) -> Result<ContentRecord, ContentError> {
    submission.tags = normalize_tags(&submission.tags);
    let shot = shot_file_name(kind, owner_id, OffsetDateTime::now_utc())?;
    let imageurl = image_url(state, &shot);

    let capture = state.shots.capture(&submission.url, &shot);
    let insert = repo::insert(&state.db, kind, owner_id, &submission, &imageurl);
    // Both sides always run to completion; a failure on one never cancels
    // the other.
    let (shot_result, insert_result) = tokio::join!(capture, insert);
    shot_result?;
    let record = insert_result?;

    Ok(record)
}

/// All rows for the owner, newest first.
pub async fn read(
    state: &AppState,
    kind: OwnerKind,
    owner_id: Uuid,
) -> Result<Vec<ContentRecord>, ContentError> {
    Ok(repo::list_by_owner(&state.db, kind, owner_id).await?)
}

/// In-place update when the URL is unchanged; otherwise re-captures under
/// a fresh name, updates the row, and best-effort deletes the old file.
pub async fn update(
    state: &AppState,
    kind: OwnerKind,
    owner_id: Uuid,
    content_id: Uuid,
    mut submission: ContentSubmission,
) -> Result<ContentRecord, ContentError> {
    submission.tags = normalize_tags(&submission.tags);

    let existing = repo::find_scoped(&state.db, kind, content_id, owner_id)
        .await?
        .ok_or(ContentError::NotFound)?;

    if existing.url == submission.url {
        let record = repo::update_fields(
            &state.db,
            kind,
            content_id,
            owner_id,
            &submission,
            &existing.imageurl,
        )
        .await?
        .ok_or(ContentError::NotFound)?;
        return Ok(record);
    }

    let shot = shot_file_name(kind, owner_id, OffsetDateTime::now_utc())?;
    let imageurl = image_url(state, &shot);

    let capture = state.shots.capture(&submission.url, &shot);
    let update = repo::update_fields(&state.db, kind, content_id, owner_id, &submission, &imageurl);
    // As in create, neither side is cancelled by the other failing.
    let (shot_result, update_result) = tokio::join!(capture, update);
    shot_result?;
    let record = update_result?.ok_or(ContentError::NotFound)?;

    remove_shot_best_effort(&state.config.shots_dir, shot_name_of(&existing.imageurl)).await;

    Ok(record)
}

/// Removes the shot file (best effort) and the row, answering with the
/// pre-deletion snapshot.
pub async fn delete(
    state: &AppState,
    kind: OwnerKind,
    owner_id: Uuid,
    content_id: Uuid,
) -> Result<ContentRecord, ContentError> {
    let existing = repo::find_scoped(&state.db, kind, content_id, owner_id)
        .await?
        .ok_or(ContentError::NotFound)?;

    remove_shot_best_effort(&state.config.shots_dir, shot_name_of(&existing.imageurl)).await;
    repo::delete_scoped(&state.db, kind, content_id, owner_id).await?;

    Ok(existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn tags_spaces_become_commas() {
        assert_eq!(normalize_tags("a b"), "a,b");
        assert_eq!(normalize_tags("rust web  backend"), "rust,web,,backend");
        assert_eq!(normalize_tags("single"), "single");
        assert_eq!(normalize_tags(""), "");
    }

    #[test]
    fn shot_name_embeds_owner_and_timestamp() {
        let owner = Uuid::new_v4();
        let at = datetime!(2024-01-31 12:00:00 UTC);
        let name = shot_file_name(OwnerKind::Registered, owner, at).expect("format");
        assert_eq!(name, format!("img-{owner}-20240131120000.jpeg"));
    }

    #[test]
    fn guest_shot_name_is_prefixed() {
        let owner = Uuid::new_v4();
        let at = datetime!(2023-06-05 01:02:03 UTC);
        let name = shot_file_name(OwnerKind::Guest, owner, at).expect("format");
        assert_eq!(name, format!("guest-img-{owner}-20230605010203.jpeg"));
    }

    #[test]
    fn shot_name_of_takes_last_segment() {
        assert_eq!(
            shot_name_of("http://host/app/images/img-1-2.jpeg"),
            "img-1-2.jpeg"
        );
        assert_eq!(shot_name_of("bare.jpeg"), "bare.jpeg");
    }

    #[tokio::test]
    async fn image_url_uses_server_origin() {
        let state = crate::state::AppState::fake();
        assert_eq!(
            image_url(&state, "img-x.jpeg"),
            "http://localhost:8080/app/images/img-x.jpeg"
        );
    }

    #[tokio::test]
    async fn create_lets_capture_run_to_completion_when_insert_fails() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        struct SlowShots(Arc<AtomicBool>);

        #[async_trait::async_trait]
        impl crate::screenshot::Screenshotter for SlowShots {
            async fn capture(&self, _url: &str, _file_name: &str) -> anyhow::Result<()> {
                // Outlive the database write so cancellation would be visible.
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                self.0.store(true, Ordering::SeqCst);
                Ok(())
            }
        }

        let finished = Arc::new(AtomicBool::new(false));
        let mut state = crate::state::AppState::fake();
        state.shots = Arc::new(SlowShots(finished.clone()));

        let submission = ContentSubmission {
            url: "http://example.com".into(),
            genre: "g".into(),
            tags: "a b".into(),
            title: "t".into(),
            overview: "o".into(),
        };

        // The lazy test pool cannot serve the insert, so the DB side fails
        // first; the capture must still be driven to its end.
        let _ = create(&state, OwnerKind::Guest, Uuid::new_v4(), submission).await;
        assert!(finished.load(Ordering::SeqCst));
    }
}
