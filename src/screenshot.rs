use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Captures a screenshot of `url` and writes it under the shots directory
/// as `file_name`. Implemented by the external headless-browser renderer;
/// tests substitute a fake.
#[async_trait]
pub trait Screenshotter: Send + Sync {
    async fn capture(&self, url: &str, file_name: &str) -> anyhow::Result<()>;
}

const SHOT_WIDTH: u32 = 1024;
const SHOT_HEIGHT: u32 = 600;

/// HTTP client for the headless-browser screenshot service. The service
/// renders the page and answers with JPEG bytes, which are written to disk.
pub struct ShotRenderer {
    http: reqwest::Client,
    endpoint: String,
    shots_dir: PathBuf,
}

impl ShotRenderer {
    pub fn new(endpoint: &str, shots_dir: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            shots_dir: PathBuf::from(shots_dir),
        }
    }
}

#[async_trait]
impl Screenshotter for ShotRenderer {
    async fn capture(&self, url: &str, file_name: &str) -> anyhow::Result<()> {
        let width = SHOT_WIDTH.to_string();
        let height = SHOT_HEIGHT.to_string();
        let body = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("url", url),
                ("width", width.as_str()),
                ("height", height.as_str()),
            ])
            .send()
            .await
            .context("screenshot renderer request")?
            .error_for_status()
            .context("screenshot renderer status")?
            .bytes()
            .await
            .context("screenshot renderer body")?;

        tokio::fs::create_dir_all(&self.shots_dir)
            .await
            .context("create shots dir")?;
        let path = self.shots_dir.join(file_name);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write shot {}", path.display()))?;
        debug!(%url, file = %file_name, bytes = body.len(), "screenshot captured");
        Ok(())
    }
}

/// Deletes a previously captured shot. Failures are logged and swallowed;
/// callers must never depend on the file being gone.
pub async fn remove_shot_best_effort(shots_dir: &str, file_name: &str) {
    let path = Path::new(shots_dir).join(file_name);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!(error = %e, file = %path.display(), "failed to remove shot file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remove_shot_deletes_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("img-test.jpeg");
        tokio::fs::write(&path, b"jpeg").await.expect("write");

        remove_shot_best_effort(dir.path().to_str().unwrap(), "img-test.jpeg").await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn remove_shot_swallows_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Must not panic or error outward.
        remove_shot_best_effort(dir.path().to_str().unwrap(), "never-written.jpeg").await;
    }
}
