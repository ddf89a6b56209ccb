//! HTTP client for the DG-LAB device control API.

use serde::Serialize;
use std::time::Duration;

/// Short: this runs on the background sender, a late answer is worthless
const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
struct StrengthRequest<'a> {
    channel: &'a str,
    strength: u32,
}

pub struct DgLabClient {
    strength_url: String,
    client: reqwest::Client,
}

impl DgLabClient {
    pub fn new(strength_url: &str) -> Self {
        Self {
            strength_url: strength_url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Default client pointing to the local DG-LAB API on port 8081
    pub fn default_local() -> Self {
        Self::new("http://127.0.0.1:8081/control/strength")
    }

    pub fn strength_url(&self) -> &str {
        &self.strength_url
    }

    pub async fn set_strength(&self, channel: &str, strength: u32) -> Result<(), String> {
        let req = StrengthRequest { channel, strength };

        let response = self
            .client
            .post(&self.strength_url)
            .json(&req)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("Timeout occurred when sending strength to {}", self.strength_url)
                } else {
                    format!("Error sending strength to {}: {}", self.strength_url, e)
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(format!(
                "DG-LAB API returned {} for {}: {}",
                status, self.strength_url, body
            ));
        }

        log::info!(
            "[DGLAB] Successfully sent strength {} to channel {}. Response: {}",
            strength,
            channel,
            body
        );
        Ok(())
    }
}
