//! HTTP fetching with conditional GET and content-hash dedup (§4.2).

use std::time::Duration;

use nc_common::sha256_hex;
use nc_domain::FrontierUrl;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use tracing::debug;

use crate::error::Result;

pub enum FetchResult {
    /// 304 Not Modified, or 200 with an identical content hash to the
    /// last fetch: no extraction should run downstream.
    Unchanged,
    New {
        body: String,
        content_hash: String,
        etag: Option<String>,
        last_modified: Option<String>,
    },
    TransportError(String),
}

pub struct Fetcher {
    http: reqwest::Client,
}

impl Fetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is static and always valid");
        Self { http }
    }

    pub async fn fetch(&self, claimed: &FrontierUrl) -> Result<FetchResult> {
        let mut request = self.http.get(&claimed.url);
        if let Some(etag) = &claimed.etag {
            request = request.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &claimed.last_modified {
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return Ok(FetchResult::TransportError(e.to_string())),
        };

        if response.status().as_u16() == 304 {
            debug!(url = %claimed.url, "304 not modified");
            return Ok(FetchResult::Unchanged);
        }
        if !response.status().is_success() {
            return Ok(FetchResult::TransportError(format!("http status {}", response.status())));
        }

        let etag = response.headers().get(ETAG).and_then(|v| v.to_str().ok()).map(str::to_string);
        let last_modified = response.headers().get(LAST_MODIFIED).and_then(|v| v.to_str().ok()).map(str::to_string);

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return Ok(FetchResult::TransportError(e.to_string())),
        };

        let content_hash = sha256_hex(&body);
        if claimed.content_hash.as_deref() == Some(content_hash.as_str()) {
            debug!(url = %claimed.url, "content hash unchanged, short-circuiting");
            return Ok(FetchResult::Unchanged);
        }

        Ok(FetchResult::New { body, content_hash, etag, last_modified })
    }
}
