use crate::{config::IpfsConfig, errors::FetchError};
use anyhow::{Context, Result};
use reqwest::{
    Client,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use utils::errors::HTTP_CLIENT_BUILD_FAILED;

// CIDv1, base16, dag-pb codec, sha2-256 multihash of 32 bytes.
const CID_V1_BASE16_PREFIX: &str = "f01701220";

/// Best-effort lookup of proposal metadata through a list of IPFS gateways.
pub struct MetadataClient {
    client: Client,
    gateways: Vec<String>,
    timeout: Duration,
}

/// `None` for the "no metadata" sentinels, otherwise the path to request from a gateway.
pub fn content_path(pointer: &str) -> Option<String> {
    let pointer = pointer.trim();
    if pointer.is_empty() || pointer == "0x0" || pointer.starts_with("0x0000") {
        return None;
    }

    match pointer.strip_prefix("0x") {
        Some(hex) if hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()) => {
            Some(format!("{CID_V1_BASE16_PREFIX}{}", hex.to_ascii_lowercase()))
        }
        Some(hex) if !hex.is_empty() => Some(hex.to_string()),
        Some(_) => None,
        None => Some(pointer.to_string()),
    }
}

impl MetadataClient {
    pub fn new(config: &IpfsConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context(HTTP_CLIENT_BUILD_FAILED)?;

        Ok(Self {
            client,
            gateways: config.gateway_urls.clone(),
            timeout,
        })
    }

    /// First gateway answering with JSON wins. Never fails: an unreachable store yields `None`.
    #[instrument(name = "fetch_metadata", skip(self))]
    pub async fn fetch(&self, pointer: &str) -> Option<Value> {
        let Some(path) = content_path(pointer) else {
            debug!("No metadata pointer on proposal");
            return None;
        };

        for gateway in &self.gateways {
            let url = format!("{}/{}", gateway.trim_end_matches('/'), path);
            debug!(url = %url, "Trying IPFS gateway");

            match self.fetch_from(&url).await {
                Ok(metadata) => {
                    info!(url = %url, "Found IPFS metadata");
                    return Some(metadata);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "IPFS gateway failed, trying next");
                }
            }
        }

        warn!(gateways = self.gateways.len(), "Metadata unavailable on every gateway");
        None
    }

    async fn fetch_from(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

pub fn metadata_title(metadata: &Value) -> Option<&str> {
    metadata
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
}
