// API client module: a small blocking HTTP client for the Cloudinary upload
// endpoint. Every request is signed with the account's API secret; no SDK
// and no process-wide state are involved, the client is built from an
// `EffectiveConfig` and passed around explicitly.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::config::EffectiveConfig;
use crate::error::UploadError;
use crate::upload::{ResourceTypeHint, UploadParams, UploadResponse, Uploader};

/// Holds a reqwest blocking client, the API base URL and the credentials.
pub struct CloudinaryClient {
    client: Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

/// Error document returned by the upload endpoint on failure.
#[derive(Deserialize, Debug)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Deserialize, Debug)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryClient {
    pub fn new(config: &EffectiveConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CloudinaryClient {
            client,
            base_url: config.api_base_url.clone(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn endpoint(&self, resource_type: ResourceTypeHint) -> String {
        format!(
            "{}/v1_1/{}/{}/upload",
            self.base_url,
            self.cloud_name,
            resource_type.as_str()
        )
    }

    /// Parameters covered by the signature. `file`, `api_key` and the
    /// resource type are sent but never signed.
    fn signed_params(
        &self,
        params: &UploadParams<'_>,
        timestamp: u64,
    ) -> BTreeMap<&'static str, String> {
        let mut signed = BTreeMap::new();
        signed.insert("timestamp", timestamp.to_string());
        if let Some(folder) = params.folder {
            signed.insert("folder", folder.to_string());
        }
        if let Some(public_id) = params.public_id {
            signed.insert("public_id", public_id.to_string());
        }
        // The endpoint overwrites by default, so `false` must be sent too.
        signed.insert("overwrite", params.overwrite.to_string());
        signed
    }
}

/// `k=v` pairs sorted by key, joined with `&`, secret appended, SHA-1 in hex.
pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl Uploader for CloudinaryClient {
    fn upload(&self, params: &UploadParams<'_>) -> Result<UploadResponse, UploadError> {
        let url = self.endpoint(params.resource_type);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let signed = self.signed_params(params, timestamp);
        let signature = sign(&signed, &self.api_secret);

        // `Form::file` sets the part's file name and guesses its mime type.
        let mut form = multipart::Form::new()
            .file("file", params.file)?
            .text("api_key", self.api_key.clone())
            .text("signature", signature);
        for (key, value) in signed {
            form = form.text(key, value);
        }

        let res = self.client.post(&url).multipart(form).send()?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&txt)
                .map(|body| body.error.message)
                .unwrap_or(txt);
            return Err(UploadError::from_status(status.as_u16(), message));
        }

        let body = res.text()?;
        serde_json::from_str::<UploadResponse>(&body)
            .map_err(|e| UploadError::MalformedResponse(e.to_string()))
    }
}
