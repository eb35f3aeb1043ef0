// cartela/src/logging.rs
// Timestamped line logging shared by the billing server and the caller.

use chrono::Local;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Build a log line: `timestamp - LEVEL - [context] message`
pub fn format_line(level: LogLevel, context: Option<&str>, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    match context {
        Some(ctx) => format!("{} - {} - [{}] {}", timestamp, level.as_str(), ctx, message),
        None => format!("{} - {} - {}", timestamp, level.as_str(), message),
    }
}

pub fn log_message(level: LogLevel, message: &str) {
    println!("{}", format_line(level, None, message));
}

/// Log with a session or retailer tag in front of the message
pub fn log_with_context(level: LogLevel, context: &str, message: &str) {
    println!("{}", format_line(level, Some(context), message));
}

pub fn log_info(message: &str) {
    log_message(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_message(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_message(LogLevel::Error, message);
}

/// Errors that must not be lost behind a raw-mode terminal go to stderr
pub fn log_error_stderr(message: &str) {
    eprintln!("{}", format_line(LogLevel::Error, None, message));
}
