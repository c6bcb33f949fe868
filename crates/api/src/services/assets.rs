//! Cloudinary client for product images.
//!
//! Uploads and deletes images through the signed upload API. Every request
//! carries a SHA-256 signature over its sorted parameters and the API secret.

use std::collections::BTreeMap;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CloudinaryConfig;

/// Image formats the upload endpoint accepts.
pub const ALLOWED_FORMATS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Errors that can occur when talking to the asset host.
#[derive(Debug, Error)]
pub enum AssetError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Destroy answered with something other than `ok` or `not found`.
    #[error("asset {asset_id} was not deleted: {result}")]
    NotDeleted { asset_id: String, result: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    /// Public HTTPS URL of the image.
    pub url: String,
    /// Host identifier (folder-qualified `public_id`) used for deletion.
    pub asset_id: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary upload API client.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_secret: SecretString,
    folder: String,
}

impl std::fmt::Debug for CloudinaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryClient")
            .field("endpoint", &self.endpoint)
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

impl CloudinaryClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, AssetError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1_1/{}/image",
                config.base_url.as_str().trim_end_matches('/'),
                config.cloud_name
            ),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
        })
    }

    /// Upload an image into the configured folder.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the host rejects the file.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadedAsset, AssetError> {
        let mut params = BTreeMap::new();
        params.insert("allowed_formats", ALLOWED_FORMATS.join(","));
        params.insert("folder", self.folder.clone());
        params.insert("timestamp", Utc::now().timestamp().to_string());

        let file = Part::bytes(bytes)
            .file_name(filename.to_owned())
            .mime_str(content_type)?;
        let form = self.signed_form(&params).part("file", file);

        let response = self
            .client
            .post(format!("{}/upload", self.endpoint))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AssetError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| AssetError::Parse(e.to_string()))?;

        tracing::info!(asset_id = %body.public_id, "Image uploaded");
        Ok(UploadedAsset {
            url: body.secure_url,
            asset_id: body.public_id,
        })
    }

    /// Delete an image.
    ///
    /// Returns `false` when the host no longer knows the asset.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the host refuses the deletion.
    #[tracing::instrument(skip(self))]
    pub async fn destroy(&self, asset_id: &str) -> Result<bool, AssetError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", asset_id.to_owned());
        params.insert("timestamp", Utc::now().timestamp().to_string());

        let response = self
            .client
            .post(format!("{}/destroy", self.endpoint))
            .multipart(self.signed_form(&params))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AssetError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| AssetError::Parse(e.to_string()))?;

        match body.result.as_str() {
            "ok" => Ok(true),
            "not found" => Ok(false),
            _ => Err(AssetError::NotDeleted {
                asset_id: asset_id.to_owned(),
                result: body.result,
            }),
        }
    }

    fn signed_form(&self, params: &BTreeMap<&'static str, String>) -> Form {
        let signature = sign(params, &self.api_secret);
        params
            .iter()
            .fold(Form::new(), |form, (key, value)| form.text(*key, value.clone()))
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
    }
}

/// Sign request parameters: `k=v` pairs sorted by key, joined by `&`, with
/// the secret appended, hashed with SHA-256 and hex-encoded.
#[must_use]
pub fn sign(params: &BTreeMap<&str, String>, secret: &SecretString) -> String {
    let joined = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.expose_secret().as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether `content_type` names an accepted image format.
#[must_use]
pub fn is_allowed_image(content_type: &str) -> bool {
    content_type
        .strip_prefix("image/")
        .is_some_and(|subtype| ALLOWED_FORMATS.contains(&subtype))
}
