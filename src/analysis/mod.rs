//! Downstream analysis submission
//!
//! The solar analysis backend expects `address`, `latitude` and `longitude`
//! alongside whatever form fields the caller collected. Only an
//! [`AnalysisTarget`] can be submitted, so an unconfirmed location never
//! reaches it.

use crate::config::Config;
use crate::constants::api::USER_AGENT;
use crate::error::{Error, Result};
use crate::location::AnalysisTarget;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::info;

/// Request body for the analysis endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Pass-through form fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AnalysisRequest {
    /// Build a request from a confirmed target
    ///
    /// Location keys in `fields` are dropped so the target always wins.
    pub fn new(target: &AnalysisTarget, mut fields: Map<String, Value>) -> Self {
        for key in ["address", "latitude", "longitude"] {
            fields.remove(key);
        }
        Self {
            address: target.address.clone(),
            latitude: target.coordinate.lat,
            longitude: target.coordinate.lng,
            fields,
        }
    }
}

/// Client for the analysis endpoint
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    client: reqwest::Client,
    endpoint: String,
}

impl AnalysisClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.analysis.endpoint,
            Duration::from_secs(config.analysis.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit a confirmed location and return the backend's JSON response
    pub async fn submit(&self, target: &AnalysisTarget, fields: Map<String, Value>) -> Result<Value> {
        let request = AnalysisRequest::new(target, fields);
        info!("Submitting analysis for {}", target.coordinate);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("analysis request to {}", self.endpoint))
                } else {
                    Error::Analysis(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Analysis(format!(
                "Endpoint returned status {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Analysis(format!("Invalid response: {}", e)))
    }
}
