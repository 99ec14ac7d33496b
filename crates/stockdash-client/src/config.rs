//! Configuration for the dashboard client

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for REST and streaming endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST API, e.g. `http://localhost:8000`
    pub api_base: String,

    /// Base URL of the streaming channel, e.g. `ws://localhost:8000`
    pub ws_base: String,

    /// Analysis type sent on task creation
    pub analysis_type: String,

    /// Number of K-line bars requested for the base series
    pub kline_limit: u32,

    /// Request timeout for REST calls
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            ws_base: "ws://localhost:8000".to_string(),
            analysis_type: "comprehensive".to_string(),
            kline_limit: 100,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Create a configuration with custom endpoint bases
    pub fn new(api_base: impl Into<String>, ws_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ws_base: ws_base.into(),
            ..Self::default()
        }
    }

    /// Set the analysis type sent on task creation
    pub fn with_analysis_type(mut self, analysis_type: impl Into<String>) -> Self {
        self.analysis_type = analysis_type.into();
        self
    }

    /// Set the base-series bar count
    pub fn with_kline_limit(mut self, limit: u32) -> Self {
        self.kline_limit = limit;
        self
    }

    /// Set the REST request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_base.is_empty() {
            return Err(ClientError::Config("api_base must not be empty".to_string()));
        }
        if self.ws_base.is_empty() {
            return Err(ClientError::Config("ws_base must not be empty".to_string()));
        }
        if self.kline_limit == 0 {
            return Err(ClientError::Config("kline_limit must be positive".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::Config(
                "request_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
