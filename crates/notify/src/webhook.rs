//! Failure alert delivery to an operator webhook.
//!
//! [`WebhookAlert`] POSTs a JSON body describing the failed rotation to a
//! configured URL. Alerts are single-shot: a failed delivery is reported to
//! the caller and the next failed rotation alerts again.

use std::time::Duration;

/// HTTP request timeout for one delivery.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook alert failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// WebhookAlert
// ---------------------------------------------------------------------------

/// Delivers rotation failure alerts to an external webhook endpoint.
pub struct WebhookAlert {
    client: reqwest::Client,
    url: String,
}

impl WebhookAlert {
    /// Create a new alert sender targeting `url`.
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, url }
    }

    /// Send one failure alert carrying the error detail and tool output.
    pub async fn send_failure_alert(&self, error: &str, output: &str) -> Result<(), WebhookError> {
        let payload = serde_json::json!({
            "service": "keywheel",
            "error": error,
            "output": output,
            "timestamp": chrono::Utc::now(),
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }

        tracing::info!(url = %self.url, "Rotation failure alert webhook sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
