//! Reqwest-backed compliance service client.
//!
//! The compliance API paginates every collection endpoint with a
//! zero-based `page` query parameter and a `{data, page, last_page}`
//! envelope; [`ComplianceClient`] follows pages until the server
//! reports the last one and returns the union.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::api::ComplianceApi;
use crate::error::{Error, Result};
use crate::model::{CheckFailure, ComplianceCheck, ComplianceDevice};

const SERVICE: &str = "compliance service";

/// Configuration for [`ComplianceClient`].
#[derive(Debug, Clone)]
pub struct ComplianceConfig {
    /// API base URL, without a trailing slash
    pub base_url: String,
    /// Bearer token for the API
    pub token: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ComplianceConfig {
    pub fn new(token: impl Into<String>) -> Self {
        ComplianceConfig {
            base_url: "https://k2.kolide.com/api/v0".to_string(),
            token: token.into(),
            timeout: Duration::from_secs(3),
        }
    }

    /// Override the API base URL (primarily for tests and staging).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Paginated response envelope used by every collection endpoint.
#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    page: u64,
    last_page: u64,
}

/// Fold one page into the accumulated entries.
///
/// Returns the next page index to request, or `None` once the server
/// reports this page is the last one.
fn accumulate<T>(entries: &mut Vec<T>, page: Page<T>) -> Option<u64> {
    let Page {
        data,
        page,
        last_page,
    } = page;
    entries.extend(data);

    if page >= last_page {
        None
    } else {
        Some(page + 1)
    }
}

/// HTTP client for the compliance service.
pub struct ComplianceClient {
    config: ComplianceConfig,
    http: reqwest::Client,
}

impl ComplianceClient {
    pub fn new(config: ComplianceConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| Error::Config("compliance API token contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .user_agent(concat!("fleetpulse/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|source| Error::http(SERVICE, source))?;

        Ok(ComplianceClient { config, http })
    }

    /// Fetch every page of a collection endpoint.
    async fn get_paginated<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.config.base_url, path);
        let mut page = 0u64;
        let mut entries = Vec::new();

        loop {
            let response = self
                .http
                .get(&url)
                .query(&[("page", page)])
                .send()
                .await
                .map_err(|source| Error::http(SERVICE, source))?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::UnexpectedStatus {
                    service: SERVICE,
                    status,
                });
            }

            let body: Page<T> = response
                .json()
                .await
                .map_err(|source| Error::http(SERVICE, source))?;

            match accumulate(&mut entries, body) {
                Some(next) => page = next,
                None => break,
            }
        }

        debug!(path, entries = entries.len(), "fetched paginated collection");
        Ok(entries)
    }
}

#[async_trait]
impl ComplianceApi for ComplianceClient {
    async fn list_devices(&self) -> Result<Vec<ComplianceDevice>> {
        self.get_paginated("devices").await
    }

    async fn list_device_failures(&self, device_id: i64) -> Result<Vec<CheckFailure>> {
        self.get_paginated(&format!("devices/{device_id}/failures"))
            .await
    }

    async fn list_checks(&self) -> Result<Vec<ComplianceCheck>> {
        self.get_paginated("checks").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_trimmed() {
        let config = ComplianceConfig::new("token").with_base_url("https://example.com/api/");
        assert_eq!(config.base_url, "https://example.com/api");
    }

    #[test]
    fn page_envelope_deserializes() {
        let page: Page<ComplianceDevice> = serde_json::from_str(
            r#"{"data": [{"id": 1, "serial": "s"}], "page": 0, "last_page": 2}"#,
        )
        .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.last_page, 2);
    }

    #[test]
    fn accumulate_merges_pages_and_stops_at_last() {
        let mut entries: Vec<i64> = Vec::new();

        let next = accumulate(
            &mut entries,
            Page {
                data: vec![1, 2],
                page: 0,
                last_page: 2,
            },
        );
        assert_eq!(next, Some(1));

        let next = accumulate(
            &mut entries,
            Page {
                data: vec![3],
                page: 1,
                last_page: 2,
            },
        );
        assert_eq!(next, Some(2));

        let next = accumulate(
            &mut entries,
            Page {
                data: vec![4],
                page: 2,
                last_page: 2,
            },
        );
        assert_eq!(next, None);

        assert_eq!(entries, vec![1, 2, 3, 4]);
    }

    #[test]
    fn accumulate_stops_immediately_on_single_page() {
        let mut entries: Vec<i64> = Vec::new();
        let next = accumulate(
            &mut entries,
            Page {
                data: vec![7],
                page: 0,
                last_page: 0,
            },
        );

        assert_eq!(next, None);
        assert_eq!(entries, vec![7]);
    }
}
