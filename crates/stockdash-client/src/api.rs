//! REST boundary consumed by the session and the fetch orchestrator
//!
//! Two seams are defined as traits so tests and alternative backends
//! can stand in for the HTTP server: `AnalysisBackend` (task creation)
//! and `MarketData` (base series + indicator fetches). `ApiClient`
//! implements both against the dashboard REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use stockdash_models::{Indicator, IndicatorSeries, Kline, Subject, TaskHandle};

/// Task-creation side of the REST API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Create one analysis task for a stock code.
    async fn create_task(&self, stock_code: &str, analysis_type: &str) -> Result<TaskHandle>;
}

/// Market-data side of the REST API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Ordered base K-line series for a subject.
    async fn fetch_kline(&self, subject: &Subject) -> Result<Vec<Kline>>;

    /// Raw series for one indicator of a subject.
    async fn fetch_indicator(
        &self,
        subject: &Subject,
        indicator: Indicator,
    ) -> Result<IndicatorSeries>;
}

#[derive(Debug, Serialize)]
struct CreateTaskRequest<'a> {
    stock_code: &'a str,
    analysis_type: &'a str,
}

/// HTTP client for the dashboard REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a new API client from a validated configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ClientError::Network)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn error_body(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if body.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {body}")
        }
    }
}

#[async_trait]
impl AnalysisBackend for ApiClient {
    async fn create_task(&self, stock_code: &str, analysis_type: &str) -> Result<TaskHandle> {
        let url = format!("{}/api/v1/analysis/create", self.config.api_base);
        debug!(stock_code, url, "creating analysis task");

        let response = self
            .client
            .post(&url)
            .json(&CreateTaskRequest {
                stock_code,
                analysis_type,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::TaskCreation(Self::error_body(response).await));
        }

        Ok(response.json::<TaskHandle>().await?)
    }
}

#[async_trait]
impl MarketData for ApiClient {
    async fn fetch_kline(&self, subject: &Subject) -> Result<Vec<Kline>> {
        let url = format!(
            "{}/api/v1/stock/{}/kline",
            self.config.api_base, subject.code
        );
        debug!(%subject, url, "fetching base series");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period", subject.period.as_str().to_string()),
                ("limit", self.config.kline_limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Api(Self::error_body(response).await));
        }

        Ok(response.json::<Vec<Kline>>().await?)
    }

    async fn fetch_indicator(
        &self,
        subject: &Subject,
        indicator: Indicator,
    ) -> Result<IndicatorSeries> {
        let url = format!(
            "{}/api/v1/stocks/{}/indicators/{}",
            self.config.api_base, subject.code, indicator
        );
        debug!(%subject, %indicator, url, "fetching indicator");

        let mut request = self.client.get(&url);
        if let Some(period) = indicator.query_period() {
            request = request.query(&[("period", period)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Api(Self::error_body(response).await));
        }

        // Decode through Value first so an unexpected shape surfaces
        // as a JSON error rather than an untagged-enum mismatch.
        let value = response.json::<Value>().await?;
        Ok(serde_json::from_value::<IndicatorSeries>(value)?)
    }
}
