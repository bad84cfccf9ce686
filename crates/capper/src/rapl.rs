use serde::Serialize;

use joule_core::JouleError;

/// Payload accepted by the node-local RAPL daemon.
#[derive(Debug, Serialize)]
struct CapRequest {
    #[serde(rename = "Percentage")]
    percentage: u64,
}

/// HTTP client for the per-node RAPL daemons.
pub struct RaplClient {
    http: reqwest::Client,
    port: u16,
}

impl RaplClient {
    pub fn new(port: u16) -> Self {
        Self {
            http: reqwest::Client::new(),
            port,
        }
    }

    /// Cap `host` at `percentage` of its zones' maximum power.
    pub async fn cap(&self, host: &str, percentage: u64) -> Result<(), JouleError> {
        let url = format!("http://{}:{}/powercap", host, self.port);
        let response = self
            .http
            .post(&url)
            .json(&CapRequest { percentage })
            .send()
            .await
            .map_err(|e| JouleError::Rapl(format!("POST {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(JouleError::Rapl(format!(
                "{} returned {}",
                host,
                response.status()
            )));
        }
        Ok(())
    }
}
