//! Project image hosting.
//!
//! Submitted image URLs are re-hosted on Cloudinary and stored as a
//! delivery URL carrying a resize transformation. When no image host is
//! configured the submitted URL is stored unchanged.

pub mod cloudinary;
pub mod config;

use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

pub use cloudinary::CloudinaryClient;
pub use config::CloudinaryConfig;

/// Errors raised while uploading to an image host.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image host returned status {status}: {message}")]
    Service { status: StatusCode, message: String },
    #[error("image host response missing `{0}`")]
    MissingField(&'static str),
    #[error("invalid image host configuration: {0}")]
    Config(String),
}

/// An uploaded asset as reported by the image host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub public_id: String,
    pub secure_url: String,
}

/// Remote image storage that can ingest an image by URL.
#[rocket::async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, source_url: &str) -> Result<UploadedImage, UploadError>;
}

/// Shared handle used by route handlers to store project images.
#[derive(Clone)]
pub struct ImageService {
    host: Option<Arc<dyn ImageHost>>,
    transformation: String,
}

impl ImageService {
    pub fn new(host: Option<Arc<dyn ImageHost>>, transformation: impl Into<String>) -> Self {
        Self {
            host,
            transformation: transformation.into(),
        }
    }

    /// Service that stores submitted URLs as-is.
    pub fn passthrough() -> Self {
        Self::new(None, config::DEFAULT_TRANSFORMATION)
    }

    pub fn from_config(config: Option<CloudinaryConfig>) -> Result<Self, UploadError> {
        match config {
            Some(config) => {
                let transformation = config.transformation.clone();
                let client = CloudinaryClient::new(config)?;
                Ok(Self::new(Some(Arc::new(client)), transformation))
            }
            None => Ok(Self::passthrough()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.host.is_some()
    }

    /// Return the URL to persist for `source_url`: the transformed delivery
    /// URL when a host is configured, otherwise `source_url` itself.
    pub async fn store_image(&self, source_url: &str) -> Result<String, UploadError> {
        let Some(host) = &self.host else {
            return Ok(source_url.to_string());
        };

        let uploaded = host.upload(source_url).await?;
        log::info!("uploaded image as '{}'", uploaded.public_id);
        Ok(delivery_url(&uploaded.secure_url, &self.transformation))
    }
}

/// Insert `transformation` after the `upload` segment of a delivery URL,
/// replacing the version segment (`v<digits>`) when one is present.
///
/// `https://res.cloudinary.com/demo/image/upload/v1712/shots/a.jpg` becomes
/// `https://res.cloudinary.com/demo/image/upload/c_fill,h_250,w_250/shots/a.jpg`.
pub fn delivery_url(secure_url: &str, transformation: &str) -> String {
    let mut segments: Vec<&str> = secure_url.split('/').collect();
    let Some(upload_idx) = segments.iter().position(|segment| *segment == "upload") else {
        return secure_url.to_string();
    };

    let next = upload_idx + 1;
    if next >= segments.len() {
        return secure_url.to_string();
    }

    if segments[next] == transformation {
        return secure_url.to_string();
    }

    // The final segment is the asset itself, never a version.
    if next < segments.len() - 1 && is_version_segment(segments[next]) {
        segments[next] = transformation;
    } else {
        segments.insert(next, transformation);
    }

    segments.join("/")
}

fn is_version_segment(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .map(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const FILL: &str = "c_fill,h_250,w_250";

    #[test]
    fn replaces_version_segment() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1712345678/sample.jpg";
        assert_eq!(
            delivery_url(url, FILL),
            "https://res.cloudinary.com/demo/image/upload/c_fill,h_250,w_250/sample.jpg"
        );
    }

    #[test]
    fn inserts_when_no_version_present() {
        let url = "https://res.cloudinary.com/demo/image/upload/hackdin/sample.jpg";
        assert_eq!(
            delivery_url(url, FILL),
            "https://res.cloudinary.com/demo/image/upload/c_fill,h_250,w_250/hackdin/sample.jpg"
        );
    }

    #[test]
    fn asset_named_like_a_version_is_kept() {
        let url = "https://res.cloudinary.com/demo/image/upload/v42";
        assert_eq!(
            delivery_url(url, FILL),
            "https://res.cloudinary.com/demo/image/upload/c_fill,h_250,w_250/v42"
        );
    }

    #[test]
    fn leaves_foreign_and_transformed_urls_alone() {
        let foreign = "https://example.com/images/sample.jpg";
        assert_eq!(delivery_url(foreign, FILL), foreign);

        let done = "https://res.cloudinary.com/demo/image/upload/c_fill,h_250,w_250/sample.jpg";
        assert_eq!(delivery_url(done, FILL), done);
    }

    struct StubHost {
        calls: Mutex<Vec<String>>,
    }

    #[rocket::async_trait]
    impl ImageHost for StubHost {
        async fn upload(&self, source_url: &str) -> Result<UploadedImage, UploadError> {
            self.calls.lock().unwrap().push(source_url.to_string());
            Ok(UploadedImage {
                public_id: "hackdin/abc".into(),
                secure_url: "https://res.cloudinary.com/demo/image/upload/v9/hackdin/abc.png".into(),
            })
        }
    }

    #[tokio::test]
    async fn store_image_uploads_and_rewrites() {
        let host = Arc::new(StubHost {
            calls: Mutex::new(Vec::new()),
        });
        let service = ImageService::new(Some(host.clone() as Arc<dyn ImageHost>), FILL);

        let stored = service
            .store_image("https://imgur.example/cat.png")
            .await
            .expect("upload succeeds");

        assert_eq!(
            stored,
            "https://res.cloudinary.com/demo/image/upload/c_fill,h_250,w_250/hackdin/abc.png"
        );
        assert_eq!(*host.calls.lock().unwrap(), vec!["https://imgur.example/cat.png"]);
    }

    #[tokio::test]
    async fn passthrough_returns_source_url() {
        let service = ImageService::passthrough();
        assert!(!service.is_enabled());
        let stored = service
            .store_image("https://imgur.example/cat.png")
            .await
            .expect("passthrough never fails");
        assert_eq!(stored, "https://imgur.example/cat.png");
    }
}
