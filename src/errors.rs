// cartela/src/errors.rs
// Error taxonomy for card lookup, billing and session control.

use std::error::Error as StdError;
use std::fmt;

use crate::session::SessionState;

/// Root error type surfaced to the operator
#[derive(Debug, Clone, PartialEq)]
pub enum GameError {
    Input(InputError),
    Authorization(AuthorizationError),
    /// Retailer balance does not cover the system commission
    Balance(String),
    /// Billing collaborator unreachable or answered with an unexpected status
    Network(String),
    /// Malformed runtime or card data
    Data(String),
    Session(SessionError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    EmptyCardId,
    NotRegistered(String),
    NotFound(String),
    NoActiveCards,
    InvalidUnitPrice(f64),
    InvalidGameData(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationError {
    NotLoggedIn,
    InsufficientRole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    NotInitialized,
    InvalidTransition { from: SessionState, action: &'static str },
    CheckUnavailable { called: usize, required: usize },
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::Input(e) => write!(f, "{e}"),
            GameError::Authorization(e) => write!(f, "{e}"),
            GameError::Balance(msg) => write!(f, "Insufficient balance: {msg}"),
            GameError::Network(msg) => write!(f, "Network error: {msg}"),
            GameError::Data(msg) => write!(f, "Data error: {msg}"),
            GameError::Session(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::EmptyCardId => write!(f, "Enter a card number"),
            InputError::NotRegistered(id) => write!(f, "Card {id} is not registered for this game"),
            InputError::NotFound(id) => write!(f, "Card {id} was not found"),
            InputError::NoActiveCards => write!(f, "No active cards provided"),
            InputError::InvalidUnitPrice(price) => write!(f, "Invalid card price: {price}"),
            InputError::InvalidGameData(msg) => write!(f, "Invalid game data: {msg}"),
        }
    }
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizationError::NotLoggedIn => write!(f, "Not logged in"),
            AuthorizationError::InsufficientRole => write!(f, "Insufficient permissions"),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotInitialized => write!(f, "Game not initialized yet"),
            SessionError::InvalidTransition { from, action } => {
                write!(f, "Cannot {action} while {from}")
            }
            SessionError::CheckUnavailable { called, required } => {
                write!(f, "Checking needs {required} called numbers, only {called} so far")
            }
        }
    }
}

impl StdError for GameError {}
impl StdError for InputError {}
impl StdError for AuthorizationError {}
impl StdError for SessionError {}

impl From<InputError> for GameError {
    fn from(err: InputError) -> Self {
        GameError::Input(err)
    }
}

impl From<AuthorizationError> for GameError {
    fn from(err: AuthorizationError) -> Self {
        GameError::Authorization(err)
    }
}

impl From<SessionError> for GameError {
    fn from(err: SessionError) -> Self {
        GameError::Session(err)
    }
}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        GameError::Data(err.to_string())
    }
}

impl From<reqwest::Error> for GameError {
    fn from(err: reqwest::Error) -> Self {
        GameError::Network(err.to_string())
    }
}

impl GameError {
    /// Short machine-readable tag used in HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::Input(_) => "input",
            GameError::Authorization(AuthorizationError::NotLoggedIn) => "not_logged_in",
            GameError::Authorization(AuthorizationError::InsufficientRole) => "forbidden",
            GameError::Balance(_) => "balance",
            GameError::Network(_) => "network",
            GameError::Data(_) => "data",
            GameError::Session(_) => "session",
        }
    }
}
