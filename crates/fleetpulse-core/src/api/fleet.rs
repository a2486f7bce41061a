//! Reqwest-backed fleet registry client.
//!
//! The fleet service sits on the private network and speaks plain HTTP
//! unless configured with port 443. Authentication is HTTP basic.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::api::FleetApi;
use crate::error::{Error, Result};
use crate::model::FleetDevice;

const SERVICE: &str = "fleet service";

/// Configuration for [`FleetClient`].
#[derive(Debug, Clone)]
pub struct FleetConfig {
    pub host: String,
    pub port: Option<u16>,
    /// Basic auth username
    pub username: String,
    /// Basic auth password
    pub password: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl FleetConfig {
    pub fn new(
        host: impl Into<String>,
        port: Option<u16>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        FleetConfig {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Assemble the base URL. Port 443 switches to https and drops the
    /// explicit port.
    pub fn base_url(&self) -> String {
        match self.port {
            Some(443) => format!("https://{}", self.host),
            Some(port) => format!("http://{}:{}", self.host, port),
            None => format!("http://{}", self.host),
        }
    }
}

/// HTTP client for the fleet registry.
pub struct FleetClient {
    config: FleetConfig,
    base_url: String,
    http: reqwest::Client,
}

impl FleetClient {
    pub fn new(config: FleetConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("fleetpulse/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|source| Error::http(SERVICE, source))?;

        let base_url = config.base_url();
        Ok(FleetClient {
            config,
            base_url,
            http,
        })
    }
}

#[async_trait]
impl FleetApi for FleetClient {
    async fn list_devices(&self) -> Result<Vec<FleetDevice>> {
        let response = self
            .http
            .get(format!("{}/devices", self.base_url))
            .basic_auth(&self.config.username, Some(&self.config.password))
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

        response
            .json()
            .await
            .map_err(|source| Error::http(SERVICE, source))
    }

    async fn update_devices(&self, devices: &[FleetDevice]) -> Result<()> {
        let response = self
            .http
            .put(format!("{}/devices/health", self.base_url))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(devices)
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

        debug!(devices = devices.len(), "submitted bulk health update");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_defaults_to_http() {
        let config = FleetConfig::new("10.255.240.1", None, "svc", "secret");
        assert_eq!(config.base_url(), "http://10.255.240.1");
    }

    #[test]
    fn explicit_port_is_appended() {
        let config = FleetConfig::new("apiserver.internal", Some(8080), "svc", "secret");
        assert_eq!(config.base_url(), "http://apiserver.internal:8080");
    }

    #[test]
    fn port_443_switches_to_https() {
        let config = FleetConfig::new("apiserver.internal", Some(443), "svc", "secret");
        assert_eq!(config.base_url(), "https://apiserver.internal");
    }
}
