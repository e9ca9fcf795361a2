use crate::error::AssetError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Copies a product asset into the target's media directory.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Stores the asset found at `location` as `file_name` and returns the
    /// stored path.
    async fn fetch(&self, location: &str, file_name: &str) -> Result<String, AssetError>;
}

/// Downloads remote assets over HTTP and copies local ones.
pub struct HttpAssetFetcher {
    client: reqwest::Client,
    media_dir: PathBuf,
}

impl HttpAssetFetcher {
    pub fn new(media_dir: impl Into<PathBuf>) -> Self {
        HttpAssetFetcher {
            client: reqwest::Client::new(),
            media_dir: media_dir.into(),
        }
    }

    fn is_remote(location: &str) -> bool {
        location.starts_with("http://") || location.starts_with("https://")
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), AssetError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        debug!(url, bytes = bytes.len(), dest = %dest.display(), "Downloaded asset");
        Ok(())
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, location: &str, file_name: &str) -> Result<String, AssetError> {
        tokio::fs::create_dir_all(&self.media_dir).await?;
        let dest = self.media_dir.join(file_name);

        if Self::is_remote(location) {
            self.download(location, &dest).await?;
        } else {
            tokio::fs::copy(location, &dest).await?;
        }
        Ok(dest.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn copies_local_files() {
        let src = tempdir().unwrap();
        let media = tempdir().unwrap();
        let file = src.path().join("shirt.jpg");
        std::fs::write(&file, b"jpeg").unwrap();

        let fetcher = HttpAssetFetcher::new(media.path().join("image"));
        let stored = fetcher
            .fetch(file.to_str().unwrap(), "shirt.jpg")
            .await
            .unwrap();
        assert_eq!(std::fs::read(stored).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn missing_local_file_is_an_io_error() {
        let media = tempdir().unwrap();
        let fetcher = HttpAssetFetcher::new(media.path());
        let err = fetcher.fetch("/nonexistent/x.png", "x.png").await.unwrap_err();
        assert!(matches!(err, AssetError::Io(_)));
    }
}
