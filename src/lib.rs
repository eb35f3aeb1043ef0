// lib.rs
// Library modules for the cartela bingo caller and billing server

pub mod defs;
pub mod logging;
pub mod errors;
pub mod config;
pub mod pouch;
pub mod board;
pub mod card;
pub mod pattern;
pub mod score;
pub mod session;
pub mod billing;
pub mod ledger;
pub mod server;
pub mod clients;
pub mod caller;
pub mod terminal;
