use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{CloudinaryConfig, ImageHost, UploadError, UploadedImage};

/// Signed-upload client for the Cloudinary image API.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("hackdin/0.1")
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &CloudinaryConfig {
        &self.config
    }

    /// Parameters covered by the signature, in the order Cloudinary signs them.
    fn signed_params(&self, timestamp: i64) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("timestamp", timestamp.to_string());
        if let Some(folder) = &self.config.folder {
            params.insert("folder", folder.clone());
        }
        params
    }
}

/// Hex SHA-256 of `k1=v1&k2=v2…` (keys sorted) followed by the API secret.
pub fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: Option<String>,
    secure_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[rocket::async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload(&self, source_url: &str) -> Result<UploadedImage, UploadError> {
        let params = self.signed_params(Utc::now().timestamp());
        let signature = sign_params(&params, &self.config.api_secret);

        let mut form: Vec<(&str, String)> = params
            .iter()
            .map(|(key, value)| (*key, value.clone()))
            .collect();
        form.push(("file", source_url.to_string()));
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        log::debug!("cloudinary: uploading {}", source_url);

        let response = self
            .http
            .post(self.config.upload_endpoint())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(UploadError::Service { status, message });
        }

        let parsed: UploadResponse = response.json().await?;
        Ok(UploadedImage {
            public_id: parsed.public_id.ok_or(UploadError::MissingField("public_id"))?,
            secure_url: parsed
                .secure_url
                .ok_or(UploadError::MissingField("secure_url"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_covers_sorted_params_and_secret() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("folder", "hackdin".to_string());

        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"folder=hackdin&timestamp=1315060510abcd");
            hex::encode(hasher.finalize())
        };

        let signature = sign_params(&params, "abcd");
        assert_eq!(signature, expected);
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn signature_is_lowercase_hex_sha256() {
        // No params: the digest is SHA-256 of the secret alone.
        let signature = sign_params(&BTreeMap::new(), "abc");
        assert_eq!(
            signature,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn signed_params_include_folder_when_configured() {
        let config = CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            api_base: "https://api.cloudinary.com".into(),
            folder: Some("showcase".into()),
            transformation: "c_fill,h_250,w_250".into(),
            request_timeout: Duration::from_secs(5),
        };
        let client = CloudinaryClient::new(config).expect("client builds");

        let params = client.signed_params(1700000000);
        assert_eq!(params.get("folder").map(String::as_str), Some("showcase"));
        assert_eq!(params.get("timestamp").map(String::as_str), Some("1700000000"));
        assert_eq!(client.config().cloud_name, "demo");
    }
}
