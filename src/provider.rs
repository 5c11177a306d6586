//! Open Exchange Rates provider integration
//!
//! Fetches the historical daily snapshot for a (date, base currency) pair.
//! The provider is a black-box collaborator: one blocking GET per work unit,
//! no retry, no timeout beyond the client default.

use crate::error::{IngestError, Result};
use crate::rates::RawSnapshot;
use chrono::NaiveDate;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;

const OPEN_EXCHANGE_RATES_BASE_URL: &str = "https://openexchangerates.org/api";

/// Trait for historical rate providers
pub trait RateProvider: Send + Sync {
    /// Fetch the snapshot for `date` with all rates expressed against `base`
    fn fetch_historical(
        &self,
        date: NaiveDate,
        base: &str,
    ) -> impl Future<Output = Result<RawSnapshot>> + Send;
}

/// HTTP client for the Open Exchange Rates API
pub struct OpenExchangeRatesClient {
    app_id: String,
    base_url: String,
    client: Client,
}

impl OpenExchangeRatesClient {
    /// Create a new client
    pub fn new(app_id: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IngestError::Fetch(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            app_id,
            base_url: OPEN_EXCHANGE_RATES_BASE_URL.to_string(),
            client,
        })
    }

    /// Point the client at a different endpoint, for tests
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn historical_url(&self, date: NaiveDate, base: &str) -> String {
        format!(
            "{}/historical/{}.json?app_id={}&base={}",
            self.base_url,
            date.format("%Y-%m-%d"),
            self.app_id,
            base
        )
    }
}

impl RateProvider for OpenExchangeRatesClient {
    async fn fetch_historical(&self, date: NaiveDate, base: &str) -> Result<RawSnapshot> {
        let url = self.historical_url(date, base);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IngestError::Fetch(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(IngestError::Fetch(format!(
                "rate provider returned error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| IngestError::Fetch(format!("Failed to read response: {}", e)))?;

        serde_json::from_str(&body)
            .map_err(|e| IngestError::Parse(format!("unexpected snapshot shape: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OpenExchangeRatesClient::new("test_key".to_string());
        assert!(client.is_ok());
    }

    #[test]
    fn test_historical_url_format() {
        let client = OpenExchangeRatesClient::new("abc123".to_string()).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        assert_eq!(
            client.historical_url(date, "SGD"),
            "https://openexchangerates.org/api/historical/2024-03-09.json?app_id=abc123&base=SGD"
        );
    }

    #[test]
    fn test_base_url_override() {
        let client = OpenExchangeRatesClient::new("k".to_string())
            .unwrap()
            .with_base_url("http://127.0.0.1:9000".to_string());
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert!(client
            .historical_url(date, "USD")
            .starts_with("http://127.0.0.1:9000/historical/2024-01-01.json"));
    }
}
