// cartela/src/ledger.rs
// Retailer accounts: balances, sales, commissions and the log of started games.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};

use crate::billing::{
    DEFAULT_CALL_INTERVAL_SECS, EndGameRequest, GameQuote, RuntimeSettings, StartGameRequest, StartReceipt,
};
use crate::errors::{AuthorizationError, GameError, InputError};
use crate::logging::{LogLevel, log_info, log_warning, log_with_context};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Retailer,
    #[default]
    Viewer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLogEntry {
    pub game_id: String,
    pub start_time: String,
    pub players_count: i64,
    pub gross: f64,
    pub retailer_cut: f64,
    pub system_commission: f64,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetailerAccount {
    pub role: Role,
    pub balance: f64,
    pub total_sales: f64,
    pub total_profit: f64,
    pub call_interval_seconds: i64,
    pub checking_pattern: Vec<String>,
    pub games: Vec<GameLogEntry>,
}

impl Default for RetailerAccount {
    fn default() -> Self {
        RetailerAccount {
            role: Role::Viewer,
            balance: 0.0,
            total_sales: 0.0,
            total_profit: 0.0,
            call_interval_seconds: DEFAULT_CALL_INTERVAL_SECS as i64,
            checking_pattern: Vec::new(),
            games: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BillingRates {
    /// Share of gross kept by the retailer
    pub retailer_cut_rate: f64,
    /// Share of the retailer cut owed to the system
    pub system_commission_rate: f64,
    pub player_threshold: u32,
    pub end_game_window: Duration,
}

impl Default for BillingRates {
    fn default() -> Self {
        BillingRates {
            retailer_cut_rate: 0.20,
            system_commission_rate: 0.20,
            player_threshold: 5,
            end_game_window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetailerLedger {
    accounts: HashMap<String, RetailerAccount>,
    #[serde(skip)]
    rates: BillingRates,
    #[serde(skip)]
    recent_endings: HashMap<String, Instant>,
}

impl RetailerLedger {
    pub fn with_rates(rates: BillingRates) -> Self {
        RetailerLedger {
            rates,
            ..Self::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P, rates: BillingRates) -> Result<Self, GameError> {
        let content = fs::read_to_string(path).map_err(|e| GameError::Data(e.to_string()))?;
        let mut ledger: RetailerLedger = serde_json::from_str(&content)?;
        ledger.rates = rates;
        Ok(ledger)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P, rates: BillingRates) -> Self {
        let path = path.as_ref();
        match Self::from_file(path, rates.clone()) {
            Ok(ledger) => {
                log_info(&format!("Loaded {} retailer accounts from {}", ledger.accounts.len(), path.display()));
                ledger
            }
            Err(e) => {
                log_warning(&format!("Could not load ledger from {}: {e}. Starting empty.", path.display()));
                Self::with_rates(rates)
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| format!("Failed to create directory {parent:?}: {e}"))?;
            }
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize ledger: {e}"))?;
        fs::write(path, json).map_err(|e| format!("Failed to write file {path:?}: {e}"))
    }

    pub fn insert_account(&mut self, retailer_id: &str, account: RetailerAccount) {
        self.accounts.insert(retailer_id.to_string(), account);
    }

    pub fn account(&self, retailer_id: &str) -> Option<&RetailerAccount> {
        self.accounts.get(retailer_id)
    }

    pub fn rates(&self) -> &BillingRates {
        &self.rates
    }

    fn logged_in<'a>(&self, retailer_id: Option<&'a str>) -> Result<&'a str, GameError> {
        match retailer_id.map(str::trim) {
            Some(id) if self.accounts.contains_key(id) => Ok(id),
            _ => Err(AuthorizationError::NotLoggedIn.into()),
        }
    }

    fn retailer<'a>(&self, retailer_id: Option<&'a str>) -> Result<&'a str, GameError> {
        let id = self.logged_in(retailer_id)?;
        match self.accounts.get(id) {
            Some(account) if account.role == Role::Retailer => Ok(id),
            _ => Err(AuthorizationError::InsufficientRole.into()),
        }
    }

    /// Settings the caller runs with; any logged in account may read them.
    pub fn runtime(&self, retailer_id: Option<&str>) -> Result<RuntimeSettings, GameError> {
        let id = self.logged_in(retailer_id)?;
        let account = &self.accounts[id];
        let call_interval_seconds = if account.call_interval_seconds <= 0 {
            DEFAULT_CALL_INTERVAL_SECS
        } else {
            account.call_interval_seconds as u64
        };
        Ok(RuntimeSettings {
            balance: account.balance.max(0.0),
            call_interval_seconds,
            allowed_patterns: account
                .checking_pattern
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        })
    }

    pub fn quote(&self, retailer_id: Option<&str>, active_cards: &[String], unit_price: f64) -> Result<GameQuote, GameError> {
        let id = self.retailer(retailer_id)?;
        if active_cards.is_empty() {
            return Err(InputError::NoActiveCards.into());
        }
        if unit_price <= 0.0 || !unit_price.is_finite() {
            return Err(InputError::InvalidUnitPrice(unit_price).into());
        }

        let player_count = active_cards.len() as u32;
        let gross = unit_price * f64::from(player_count);
        let operator_cut = gross * self.rates.retailer_cut_rate;
        let commission = operator_cut * self.rates.system_commission_rate;
        let balance = self.accounts[id].balance.max(0.0);

        Ok(GameQuote {
            prize_pool: gross - operator_cut,
            can_play: balance >= commission,
            commission,
            operator_cut,
            gross,
            player_count,
            below_threshold: player_count < self.rates.player_threshold,
            current_balance: balance,
        })
    }

    /// Charge the commission and log the game. Nothing changes on failure.
    pub fn start(&mut self, retailer_id: Option<&str>, request: &StartGameRequest) -> Result<StartReceipt, GameError> {
        let id = self.retailer(retailer_id)?.to_string();
        if request.commission < 0.0 || request.operator_cut < 0.0 || request.gross < 0.0 || request.player_count <= 0 {
            return Err(InputError::InvalidGameData("negative amounts or no players".to_string()).into());
        }

        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(GameError::Authorization(AuthorizationError::NotLoggedIn))?;
        if account.balance < request.commission {
            return Err(GameError::Balance("Not enough balance".to_string()));
        }

        let game_id = format!("game_{}_{}_{}", id, Utc::now().timestamp(), rand::random_range(1000..10000));
        account.balance -= request.commission;
        account.total_sales += request.gross;
        account.total_profit += request.operator_cut;
        account.games.push(GameLogEntry {
            game_id: game_id.clone(),
            start_time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            players_count: request.player_count,
            gross: request.gross,
            retailer_cut: request.operator_cut,
            system_commission: request.commission,
            end_time: None,
        });
        let new_balance = account.balance;

        log_with_context(
            LogLevel::Info,
            &id,
            &format!("Started {game_id}: {} players, gross {:.2}, commission {:.2}", request.player_count, request.gross, request.commission),
        );

        Ok(StartReceipt {
            session_id: game_id,
            new_balance,
            message: "Game started successfully".to_string(),
        })
    }

    pub fn end(&mut self, retailer_id: Option<&str>, request: &EndGameRequest) -> Result<bool, GameError> {
        self.end_at(retailer_id, request, Instant::now())
    }

    /// Record the end of a game. Returns false for a duplicate session id.
    pub fn end_at(&mut self, retailer_id: Option<&str>, request: &EndGameRequest, now: Instant) -> Result<bool, GameError> {
        let id = self.retailer(retailer_id)?.to_string();
        let window = self.rates.end_game_window;
        self.recent_endings.retain(|_, seen| now.saturating_duration_since(*seen) < window);
        if self.recent_endings.contains_key(&request.session_id) {
            return Ok(false);
        }

        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(GameError::Authorization(AuthorizationError::NotLoggedIn))?;
        let entry = account
            .games
            .iter_mut()
            .find(|game| game.game_id == request.session_id)
            .ok_or_else(|| InputError::InvalidGameData(format!("unknown session {}", request.session_id)))?;
        if entry.end_time.is_some() {
            return Ok(false);
        }
        entry.end_time = Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
        if request.player_count > 0 {
            entry.players_count = request.player_count;
        }
        self.recent_endings.insert(request.session_id.clone(), now);

        log_with_context(LogLevel::Info, &id, &format!("Ended {}", request.session_id));
        Ok(true)
    }
}
