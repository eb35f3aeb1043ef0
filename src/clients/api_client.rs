// cartela/src/clients/api_client.rs
// HTTP billing client used by the caller against `cartela-server`.

use std::future::Future;
use std::time::Duration;

use super::common::{get_json, post_json};
use crate::billing::{
    BillingBackend, EndGameRequest, EndReceipt, GameQuote, InitGameRequest, RuntimeSettings, StartGameRequest,
    StartReceipt,
};
use crate::config::CallerConfig;
use crate::errors::{AuthorizationError, GameError};
use crate::logging::log_warning;

#[derive(Debug, Clone)]
pub struct HttpBilling {
    server_url: String,
    retailer_id: String,
    http_client: reqwest::Client,
    retry_attempts: u32,
}

impl HttpBilling {
    pub fn new(config: &CallerConfig) -> Result<Self, GameError> {
        if config.retailer_id.trim().is_empty() {
            return Err(AuthorizationError::NotLoggedIn.into());
        }
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            server_url: config.server_url(),
            retailer_id: config.retailer_id.trim().to_string(),
            http_client,
            retry_attempts: config.retry_attempts,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{route}", self.server_url.trim_end_matches('/'))
    }

    /// Repeat an idempotent request while the server cannot be reached.
    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, GameError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GameError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(GameError::Network(msg)) if attempt < self.retry_attempts => {
                    attempt += 1;
                    log_warning(&format!("{what} failed ({msg}), retry {attempt}/{}", self.retry_attempts));
                    tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
                }
                other => return other,
            }
        }
    }
}

impl BillingBackend for HttpBilling {
    async fn init_game(&self, active_cards: &[String], unit_price: f64) -> Result<GameQuote, GameError> {
        let request = InitGameRequest {
            active_cards: active_cards.to_vec(),
            unit_price,
        };
        let url = self.url("init");
        self.with_retry("init_game", || post_json(&self.http_client, &url, &request, &self.retailer_id))
            .await
    }

    // Charging is not idempotent, so no retry here
    async fn start_game(&self, request: &StartGameRequest) -> Result<StartReceipt, GameError> {
        post_json(&self.http_client, &self.url("start"), request, &self.retailer_id).await
    }

    async fn end_game(&self, request: &EndGameRequest) -> Result<EndReceipt, GameError> {
        let url = self.url("end");
        self.with_retry("end_game", || post_json(&self.http_client, &url, request, &self.retailer_id))
            .await
    }

    async fn get_runtime(&self) -> Result<RuntimeSettings, GameError> {
        let url = self.url("runtime");
        self.with_retry("get_runtime", || get_json(&self.http_client, &url, &self.retailer_id))
            .await
    }
}
