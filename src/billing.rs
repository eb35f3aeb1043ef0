// cartela/src/billing.rs
// Wire types and the collaborator interface used to authorize and bill games.

use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::ledger::RetailerLedger;

pub const DEFAULT_CALL_INTERVAL_SECS: u64 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitGameRequest {
    pub active_cards: Vec<String>,
    pub unit_price: f64,
}

/// Prize and commission figures for a prospective game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameQuote {
    pub prize_pool: f64,
    pub can_play: bool,
    pub commission: f64,
    pub operator_cut: f64,
    pub gross: f64,
    pub player_count: u32,
    #[serde(default)]
    pub below_threshold: bool,
    #[serde(default)]
    pub current_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartGameRequest {
    pub commission: f64,
    pub operator_cut: f64,
    pub gross: f64,
    pub player_count: i64,
}

impl From<&GameQuote> for StartGameRequest {
    fn from(quote: &GameQuote) -> Self {
        StartGameRequest {
            commission: quote.commission,
            operator_cut: quote.operator_cut,
            gross: quote.gross,
            player_count: i64::from(quote.player_count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartReceipt {
    pub session_id: String,
    pub new_balance: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndGameRequest {
    pub player_count: i64,
    pub gross: f64,
    pub operator_cut: f64,
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndReceipt {
    /// false when the session id was already recorded
    pub recorded: bool,
}

/// Per-retailer runtime settings. Missing fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub balance: f64,
    pub call_interval_seconds: u64,
    pub allowed_patterns: Vec<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        RuntimeSettings {
            balance: 0.0,
            call_interval_seconds: DEFAULT_CALL_INTERVAL_SECS,
            allowed_patterns: Vec::new(),
        }
    }
}

/// The authorization and billing collaborator a caller talks to.
pub trait BillingBackend {
    fn init_game(
        &self,
        active_cards: &[String],
        unit_price: f64,
    ) -> impl Future<Output = Result<GameQuote, GameError>> + Send;

    fn start_game(
        &self,
        request: &StartGameRequest,
    ) -> impl Future<Output = Result<StartReceipt, GameError>> + Send;

    /// Fire-and-forget; duplicates of a session id are ignored server side.
    fn end_game(&self, request: &EndGameRequest) -> impl Future<Output = Result<EndReceipt, GameError>> + Send;

    fn get_runtime(&self) -> impl Future<Output = Result<RuntimeSettings, GameError>> + Send;
}

/// In-process backend over a shared ledger, for offline play and tests.
#[derive(Clone)]
pub struct LocalBilling {
    ledger: Arc<Mutex<RetailerLedger>>,
    retailer_id: Option<String>,
}

impl LocalBilling {
    pub fn new(ledger: Arc<Mutex<RetailerLedger>>, retailer_id: Option<&str>) -> Self {
        LocalBilling {
            ledger,
            retailer_id: retailer_id.map(str::to_string),
        }
    }

    fn with_ledger<T>(&self, f: impl FnOnce(&mut RetailerLedger) -> Result<T, GameError>) -> Result<T, GameError> {
        let mut ledger = self
            .ledger
            .lock()
            .map_err(|_| GameError::Data("Failed to acquire ledger lock".to_string()))?;
        f(&mut ledger)
    }
}

impl BillingBackend for LocalBilling {
    async fn init_game(&self, active_cards: &[String], unit_price: f64) -> Result<GameQuote, GameError> {
        self.with_ledger(|ledger| ledger.quote(self.retailer_id.as_deref(), active_cards, unit_price))
    }

    async fn start_game(&self, request: &StartGameRequest) -> Result<StartReceipt, GameError> {
        self.with_ledger(|ledger| ledger.start(self.retailer_id.as_deref(), request))
    }

    async fn end_game(&self, request: &EndGameRequest) -> Result<EndReceipt, GameError> {
        self.with_ledger(|ledger| ledger.end(self.retailer_id.as_deref(), request))
            .map(|recorded| EndReceipt { recorded })
    }

    async fn get_runtime(&self) -> Result<RuntimeSettings, GameError> {
        self.with_ledger(|ledger| ledger.runtime(self.retailer_id.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AuthorizationError;
    use crate::ledger::{RetailerAccount, Role};

    fn shared_ledger() -> Arc<Mutex<RetailerLedger>> {
        let mut ledger = RetailerLedger::default();
        ledger.insert_account(
            "shop_1",
            RetailerAccount {
                role: Role::Retailer,
                balance: 100.0,
                call_interval_seconds: 4,
                checking_pattern: vec!["Any Horizontal".to_string()],
                ..RetailerAccount::default()
            },
        );
        Arc::new(Mutex::new(ledger))
    }

    fn cards(n: usize) -> Vec<String> {
        (1..=n).map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_runtime_settings_defaults_on_partial_json() {
        let settings: RuntimeSettings = serde_json::from_str(r#"{"balance": 12.5}"#).unwrap();
        assert_eq!(settings.balance, 12.5);
        assert_eq!(settings.call_interval_seconds, 3);
        assert!(settings.allowed_patterns.is_empty());
    }

    #[tokio::test]
    async fn test_local_billing_full_cycle() {
        let ledger = shared_ledger();
        let billing = LocalBilling::new(Arc::clone(&ledger), Some("shop_1"));

        let runtime = billing.get_runtime().await.unwrap();
        assert_eq!(runtime.call_interval_seconds, 4);

        let quote = billing.init_game(&cards(5), 10.0).await.unwrap();
        assert!(quote.can_play);
        let receipt = billing.start_game(&StartGameRequest::from(&quote)).await.unwrap();
        assert!(receipt.session_id.starts_with("game_shop_1_"));

        let end = EndGameRequest {
            player_count: 5,
            gross: quote.gross,
            operator_cut: quote.operator_cut,
            session_id: receipt.session_id.clone(),
        };
        assert!(billing.end_game(&end).await.unwrap().recorded);
        assert!(!billing.end_game(&end).await.unwrap().recorded);
    }

    #[tokio::test]
    async fn test_local_billing_requires_login() {
        let billing = LocalBilling::new(shared_ledger(), None);
        let err = billing.get_runtime().await.unwrap_err();
        assert_eq!(err, GameError::Authorization(AuthorizationError::NotLoggedIn));
    }
}
