// cartela/src/config.rs
// `key = value` configuration files for the billing server and the caller.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::ledger::BillingRates;
use crate::logging::{log_info, log_warning};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub ledger_path: String,
    pub retailer_cut_rate: f64,
    pub system_commission_rate: f64,
    pub player_threshold: u32,
    pub end_game_window_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CallerConfig {
    pub host: String,
    pub port: u16,
    pub timeout: u64,
    pub retry_attempts: u32,
    pub retailer_id: String,
    pub unit_price: f64,
    pub required_lines: u32,
    pub cards_path: String,
    pub active_cards: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            ledger_path: "data/ledger.json".to_string(),
            retailer_cut_rate: 0.20,
            system_commission_rate: 0.20,
            player_threshold: 5,
            end_game_window_secs: 60,
        }
    }
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            timeout: 30,
            retry_attempts: 3,
            retailer_id: String::new(),
            unit_price: 10.0,
            required_lines: 1,
            cards_path: "data/cards.json".to_string(),
            active_cards: Vec::new(),
        }
    }
}

fn get_or<T: std::str::FromStr>(map: &HashMap<String, String>, key: &str, default: T) -> T {
    map.get(key).and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}

fn get_string(map: &HashMap<String, String>, key: &str, default: &str) -> String {
    map.get(key).cloned().unwrap_or_else(|| default.to_string())
}

/// Comma separated list, blanks dropped
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

impl ServerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_map(&parse_config(&content)?))
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        ServerConfig {
            host: get_string(map, "host", &defaults.host),
            port: get_or(map, "port", defaults.port),
            ledger_path: get_string(map, "ledger_path", &defaults.ledger_path),
            retailer_cut_rate: get_or(map, "retailer_cut_rate", defaults.retailer_cut_rate),
            system_commission_rate: get_or(map, "system_commission_rate", defaults.system_commission_rate),
            player_threshold: get_or(map, "player_threshold", defaults.player_threshold),
            end_game_window_secs: get_or(map, "end_game_window_secs", defaults.end_game_window_secs),
        }
    }

    pub fn load_or_default() -> Self {
        let config_path = "conf/server.conf";

        match Self::from_file(config_path) {
            Ok(config) => {
                log_info(&format!("Loaded server configuration from {config_path}"));
                config
            }
            Err(e) => {
                log_warning(&format!("Could not load config from {config_path}: {e}. Using defaults."));
                Self::default()
            }
        }
    }

    pub fn rates(&self) -> BillingRates {
        BillingRates {
            retailer_cut_rate: self.retailer_cut_rate,
            system_commission_rate: self.system_commission_rate,
            player_threshold: self.player_threshold,
            end_game_window: Duration::from_secs(self.end_game_window_secs),
        }
    }
}

impl CallerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_map(&parse_config(&content)?))
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        CallerConfig {
            host: get_string(map, "host", &defaults.host),
            port: get_or(map, "port", defaults.port),
            timeout: get_or(map, "timeout", defaults.timeout),
            retry_attempts: get_or(map, "retry_attempts", defaults.retry_attempts),
            retailer_id: get_string(map, "retailer_id", &defaults.retailer_id),
            unit_price: get_or(map, "unit_price", defaults.unit_price),
            required_lines: map
                .get("required_lines")
                .map(|raw| crate::pattern::parse_required_lines(raw))
                .unwrap_or(defaults.required_lines),
            cards_path: get_string(map, "cards_path", &defaults.cards_path),
            active_cards: map.get("active_cards").map(|raw| parse_list(raw)).unwrap_or_default(),
        }
    }

    pub fn load_or_default() -> Self {
        let config_path = "conf/caller.conf";

        match Self::from_file(config_path) {
            Ok(config) => {
                log_info(&format!("Loaded caller configuration from {config_path}"));
                config
            }
            Err(e) => {
                log_warning(&format!("Could not load caller config from {config_path}: {e}. Using defaults."));
                Self::default()
            }
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn parse_config(content: &str) -> Result<HashMap<String, String>, Box<dyn std::error::Error>> {
    let mut config = HashMap::new();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            config.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    Ok(config)
}
