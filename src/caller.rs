// cartela/src/caller.rs
// Caller session: ties the session controller to the billing collaborator.

use std::time::Duration;

use crate::billing::{BillingBackend, EndGameRequest, GameQuote, RuntimeSettings, StartGameRequest, StartReceipt};
use crate::card::CardStore;
use crate::defs::Number;
use crate::errors::{GameError, InputError, SessionError};
use crate::logging::{log_info, log_warning};
use crate::pattern::PatternConfig;
use crate::session::{CheckOutcome, SessionController, SessionState};

pub struct CallerSession<B: BillingBackend> {
    billing: B,
    controller: SessionController,
    unit_price: f64,
    required_lines: u32,
    quote: Option<GameQuote>,
    runtime: RuntimeSettings,
    billing_session: Option<String>,
}

impl<B: BillingBackend> CallerSession<B> {
    pub fn new(billing: B, cards: CardStore, unit_price: f64, required_lines: u32) -> Self {
        Self::with_controller(billing, SessionController::new(cards, PatternConfig::default()), unit_price, required_lines)
    }

    pub fn with_controller(billing: B, controller: SessionController, unit_price: f64, required_lines: u32) -> Self {
        CallerSession {
            billing,
            controller,
            unit_price,
            required_lines: required_lines.max(1),
            quote: None,
            runtime: RuntimeSettings::default(),
            billing_session: None,
        }
    }

    /// Quote the game and fetch runtime settings.
    pub async fn initialize(&mut self) -> Result<&GameQuote, GameError> {
        let active = self.controller.cards().active_ids().to_vec();
        if active.is_empty() {
            return Err(InputError::NoActiveCards.into());
        }

        let (quote, runtime) = tokio::join!(
            self.billing.init_game(&active, self.unit_price),
            self.billing.get_runtime()
        );
        let quote = quote?;
        self.runtime = runtime.unwrap_or_else(|e| {
            log_warning(&format!("Runtime settings unavailable ({e}), using defaults"));
            RuntimeSettings::default()
        });

        self.controller
            .set_patterns(PatternConfig::from_labels(&self.runtime.allowed_patterns, self.required_lines));
        if self.runtime.allowed_patterns.is_empty() {
            log_warning("No winning patterns enabled for this retailer; no card can win");
        }
        if quote.below_threshold {
            log_warning(&format!("Only {} players for this game", quote.player_count));
        }

        log_info(&format!(
            "Game quoted: {} players, gross {:.2}, prize {:.2}, commission {:.2}",
            quote.player_count, quote.gross, quote.prize_pool, quote.commission
        ));
        let quote = self.quote.insert(quote);
        Ok(&*quote)
    }

    /// Bill the game, then start calling. Nothing changes if billing fails.
    pub async fn start(&mut self) -> Result<Option<Number>, GameError> {
        if !self.controller.can_start() {
            return Err(SessionError::InvalidTransition {
                from: self.controller.state(),
                action: "start",
            }
            .into());
        }
        let quote = self.quote.as_ref().ok_or(SessionError::NotInitialized)?;
        if !quote.can_play {
            return Err(GameError::Balance(format!(
                "Balance {:.2} does not cover commission {:.2}",
                quote.current_balance, quote.commission
            )));
        }
        let request = StartGameRequest::from(quote);

        // an exhausted game is closed before the next one is billed
        self.finish().await;

        let StartReceipt { session_id, new_balance, .. } = self.billing.start_game(&request).await?;
        log_info(&format!("Game {session_id} started, balance now {new_balance:.2}"));
        self.runtime.balance = new_balance;
        self.billing_session = Some(session_id);
        self.controller.start()
    }

    pub fn pause(&mut self) -> Result<(), GameError> {
        self.controller.pause()
    }

    pub fn resume(&mut self) -> Result<(), GameError> {
        self.controller.resume()
    }

    pub fn tick(&mut self) -> Option<Number> {
        self.controller.tick()
    }

    pub fn check(&mut self, card_id: &str) -> Result<CheckOutcome, GameError> {
        self.controller.check(card_id)
    }

    /// End the billed game, if any, and return to idle.
    pub async fn reset(&mut self) {
        self.finish().await;
        self.controller.reset();
    }

    /// Report the end of the current billed game. Failures are only logged.
    pub async fn finish(&mut self) {
        let Some(session_id) = self.billing_session.take() else {
            return;
        };
        let Some(quote) = self.quote.as_ref() else {
            return;
        };
        let request = EndGameRequest {
            player_count: i64::from(quote.player_count),
            gross: quote.gross,
            operator_cut: quote.operator_cut,
            session_id,
        };
        match self.billing.end_game(&request).await {
            Ok(receipt) if receipt.recorded => log_info(&format!("Game {} ended", request.session_id)),
            Ok(_) => log_info(&format!("Game {} was already recorded", request.session_id)),
            Err(e) => log_warning(&format!("Failed to record end of {}: {e}", request.session_id)),
        }
    }

    pub fn call_interval(&self) -> Duration {
        Duration::from_secs(self.runtime.call_interval_seconds.max(1))
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn quote(&self) -> Option<&GameQuote> {
        self.quote.as_ref()
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub fn billing_session(&self) -> Option<&str> {
        self.billing_session.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::billing::{EndReceipt, LocalBilling};
    use crate::card::Card;
    use crate::errors::AuthorizationError;
    use crate::ledger::{RetailerAccount, RetailerLedger, Role};
    use crate::pattern::PatternKind;
    use crate::pouch::CallSequence;

    fn shared_ledger(balance: f64, patterns: &[&str]) -> Arc<Mutex<RetailerLedger>> {
        let mut ledger = RetailerLedger::default();
        ledger.insert_account(
            "shop_1",
            RetailerAccount {
                role: Role::Retailer,
                balance,
                call_interval_seconds: 2,
                checking_pattern: patterns.iter().map(|p| p.to_string()).collect(),
                ..RetailerAccount::default()
            },
        );
        Arc::new(Mutex::new(ledger))
    }

    fn store(active: &[&str]) -> CardStore {
        let mut store = CardStore::new();
        store.insert(Card::from_columns(
            "17",
            ["5,3,07,1,14", "12,18,29,16,30", "28,33,,44,31", "41,47,59,60,46", "61,75,62,70,66"],
        ));
        for id in ["1", "2", "3", "4"] {
            store.insert(Card::from_columns(id, ["2", "17", "32", "47", "62"]));
        }
        store.set_active(active.iter().copied());
        store
    }

    fn session(ledger: &Arc<Mutex<RetailerLedger>>, active: &[&str]) -> CallerSession<LocalBilling> {
        let mut order: Vec<Number> = vec![5, 12, 28, 41, 61];
        order.extend((1..=75).filter(|n| ![5, 12, 28, 41, 61].contains(n)));
        let controller = SessionController::with_sequence(
            store(active),
            PatternConfig::default(),
            CallSequence::from_numbers(order).unwrap(),
        );
        CallerSession::with_controller(LocalBilling::new(Arc::clone(ledger), Some("shop_1")), controller, 10.0, 1)
    }

    #[tokio::test]
    async fn test_initialize_applies_runtime_patterns() {
        let ledger = shared_ledger(100.0, &["Any Horizontal", "4 Single Corner"]);
        let mut caller = session(&ledger, &["17", "1", "2", "3", "4"]);

        let quote = caller.initialize().await.unwrap().clone();
        assert_eq!(quote.player_count, 5);
        assert!(quote.can_play);
        assert!(!quote.below_threshold);
        assert_eq!(caller.call_interval(), Duration::from_secs(2));
        let patterns = caller.controller().patterns();
        assert!(patterns.is_enabled(PatternKind::AnyHorizontal));
        assert!(patterns.is_enabled(PatternKind::FourCorners));
        assert!(!patterns.is_enabled(PatternKind::AnyVertical));
    }

    /// Quotes and charges normally, but runtime settings are unreachable.
    struct RuntimeUnavailable;

    impl BillingBackend for RuntimeUnavailable {
        async fn init_game(&self, active_cards: &[String], unit_price: f64) -> Result<GameQuote, GameError> {
            let gross = unit_price * active_cards.len() as f64;
            Ok(GameQuote {
                prize_pool: gross * 0.8,
                can_play: true,
                commission: gross * 0.04,
                operator_cut: gross * 0.2,
                gross,
                player_count: active_cards.len() as u32,
                below_threshold: false,
                current_balance: 100.0,
            })
        }

        async fn start_game(&self, _request: &StartGameRequest) -> Result<StartReceipt, GameError> {
            Ok(StartReceipt {
                session_id: "game_offline_1".to_string(),
                new_balance: 99.0,
                message: String::new(),
            })
        }

        async fn end_game(&self, _request: &EndGameRequest) -> Result<EndReceipt, GameError> {
            Ok(EndReceipt { recorded: true })
        }

        async fn get_runtime(&self) -> Result<RuntimeSettings, GameError> {
            Err(GameError::Network("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_runtime_failure_falls_back_to_defaults() {
        let controller = SessionController::new(store(&["17"]), PatternConfig::default());
        let mut caller = CallerSession::with_controller(RuntimeUnavailable, controller, 10.0, 1);

        let quote = caller.initialize().await.unwrap();
        assert_eq!(quote.player_count, 1);
        assert_eq!(caller.call_interval(), Duration::from_secs(3));
        assert_eq!(caller.runtime(), &RuntimeSettings::default());
        assert_eq!(caller.controller().patterns().enabled().count(), 0);

        caller.start().await.unwrap();
        while caller.tick().is_some() {}
        assert_eq!(caller.state(), SessionState::Exhausted);

        // every number is called, yet nothing can win without patterns
        let outcome = caller.check("17").unwrap();
        assert!(!outcome.evaluation.completed_lines.is_empty());
        assert_eq!(outcome.evaluation.eligible_count, 0);
        assert!(!outcome.evaluation.is_winner);
    }

    #[tokio::test]
    async fn test_initialize_without_active_cards() {
        let ledger = shared_ledger(100.0, &["Any Horizontal"]);
        let mut caller = session(&ledger, &[]);
        assert_eq!(
            caller.initialize().await.unwrap_err(),
            GameError::Input(InputError::NoActiveCards)
        );
    }

    #[tokio::test]
    async fn test_start_requires_initialize() {
        let ledger = shared_ledger(100.0, &["Any Horizontal"]);
        let mut caller = session(&ledger, &["17"]);
        assert_eq!(
            caller.start().await.unwrap_err(),
            GameError::Session(SessionError::NotInitialized)
        );
        assert_eq!(caller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_insufficient_balance_does_not_start() {
        let ledger = shared_ledger(0.5, &["Any Horizontal"]);
        let mut caller = session(&ledger, &["17", "1", "2", "3", "4"]);
        let quote = caller.initialize().await.unwrap();
        assert!(!quote.can_play);

        assert!(matches!(caller.start().await, Err(GameError::Balance(_))));
        assert_eq!(caller.state(), SessionState::Idle);
        assert_eq!(caller.controller().call_count(), 0);
        assert!(ledger.lock().unwrap().account("shop_1").unwrap().games.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_retailer_cannot_initialize() {
        let ledger = shared_ledger(100.0, &["Any Horizontal"]);
        let controller = SessionController::new(store(&["17"]), PatternConfig::default());
        let mut caller = CallerSession::with_controller(LocalBilling::new(ledger, Some("ghost")), controller, 10.0, 1);
        assert_eq!(
            caller.initialize().await.unwrap_err(),
            GameError::Authorization(AuthorizationError::NotLoggedIn)
        );
    }

    #[tokio::test]
    async fn test_full_game_bills_and_ends_once() {
        let ledger = shared_ledger(100.0, &["Any Horizontal"]);
        let mut caller = session(&ledger, &["17", "1", "2", "3", "4"]);
        caller.initialize().await.unwrap();

        assert_eq!(caller.start().await.unwrap(), Some(5));
        let session_id = caller.billing_session().unwrap().to_string();
        assert!((caller.runtime().balance - 98.0).abs() < 1e-9);

        for _ in 0..4 {
            caller.tick();
        }
        let outcome = caller.check("17").unwrap();
        assert!(outcome.evaluation.is_winner);
        assert_eq!(caller.state(), SessionState::Paused);
        assert_eq!(caller.tick(), None);

        caller.resume().unwrap();
        caller.finish().await;
        assert!(caller.billing_session().is_none());
        caller.finish().await;

        let guard = ledger.lock().unwrap();
        let games = &guard.account("shop_1").unwrap().games;
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_id, session_id);
        assert!(games[0].end_time.is_some());
    }

    #[tokio::test]
    async fn test_start_while_running_is_rejected_without_billing() {
        let ledger = shared_ledger(100.0, &["Any Horizontal"]);
        let mut caller = session(&ledger, &["17", "1", "2", "3", "4"]);
        caller.initialize().await.unwrap();
        caller.start().await.unwrap();

        assert!(matches!(
            caller.start().await,
            Err(GameError::Session(SessionError::InvalidTransition { .. }))
        ));
        assert_eq!(ledger.lock().unwrap().account("shop_1").unwrap().games.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_ends_billed_game() {
        let ledger = shared_ledger(100.0, &["Any Horizontal"]);
        let mut caller = session(&ledger, &["17", "1", "2", "3", "4"]);
        caller.initialize().await.unwrap();
        caller.start().await.unwrap();
        caller.reset().await;

        assert_eq!(caller.state(), SessionState::Idle);
        assert!(caller.billing_session().is_none());
        let guard = ledger.lock().unwrap();
        assert!(guard.account("shop_1").unwrap().games[0].end_time.is_some());
    }
}
