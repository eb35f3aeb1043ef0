// cartela/src/terminal.rs
// This module handles terminal input/output for the caller.

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tokio::sync::mpsc::UnboundedSender;

use crate::defs::{BOARDCONFIG, COLUMN_LETTERS, FIRSTNUMBER, FREE_COL, FREE_ROW, GRID_SIZE, Number, letter_for};
use crate::logging::log_error_stderr;
use crate::score::{CompletedLine, LineKind};
use crate::session::{CheckOutcome, SessionState};

const GREEN: &str = "\x1b[1;32m";
const YELLOW: &str = "\x1b[1;33m";
const RED: &str = "\x1b[1;31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// What a key press asks the caller loop to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Start, pause or resume depending on state
    Toggle,
    /// The operator is about to type a card id
    CheckRequested,
    CheckCard(String),
    Reset,
    Quit,
}

pub fn key_action(key: &KeyEvent) -> Option<KeyAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(KeyAction::Quit);
    }
    match key.code {
        KeyCode::Char(' ') => Some(KeyAction::Toggle),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(KeyAction::CheckRequested),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(KeyAction::Reset),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(KeyAction::Quit),
        _ => None,
    }
}

fn read_card_id() -> Option<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    Some(line.trim().to_string())
}

/// Read keys on a blocking thread in raw mode and forward them as actions.
/// The thread stops after Quit or once the receiver is dropped.
pub fn spawn_key_reader(tx: UnboundedSender<KeyAction>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = enable_raw_mode() {
            log_error_stderr(&format!("Cannot enable raw mode: {e}"));
            let _ = tx.send(KeyAction::Quit);
            return;
        }

        // Clear any pending events in the buffer
        while let Ok(true) = event::poll(Duration::from_millis(0)) {
            let _ = event::read();
        }

        loop {
            match event::poll(Duration::from_millis(200)) {
                Ok(true) => {}
                Ok(false) => {
                    if tx.is_closed() {
                        break;
                    }
                    continue;
                }
                Err(_) => break,
            }
            let Ok(Event::Key(key)) = event::read() else {
                continue;
            };
            // Only process key press events, not key release events
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let Some(action) = key_action(&key) else {
                continue;
            };

            match action {
                KeyAction::CheckRequested => {
                    if tx.send(KeyAction::CheckRequested).is_err() {
                        break;
                    }
                    let _ = disable_raw_mode();
                    let card_id = read_card_id().unwrap_or_default();
                    let _ = enable_raw_mode();
                    if tx.send(KeyAction::CheckCard(card_id)).is_err() {
                        break;
                    }
                }
                KeyAction::Quit => {
                    let _ = tx.send(KeyAction::Quit);
                    break;
                }
                other => {
                    if tx.send(other).is_err() {
                        break;
                    }
                }
            }
        }

        let _ = disable_raw_mode();
    })
}

/// Called numbers laid out as one row per letter, the current one highlighted.
pub fn format_board(called: &[Number], current: Option<Number>) -> Vec<String> {
    let mut lines = Vec::new();
    let gap = " ".repeat(BOARDCONFIG.hnumbers_space as usize);

    for letter in 0..BOARDCONFIG.letters {
        let first = FIRSTNUMBER + letter * BOARDCONFIG.numbers_per_letter;
        let mut row = format!("{} ", COLUMN_LETTERS[letter as usize]);
        for number in first..first + BOARDCONFIG.numbers_per_letter {
            row.push_str(&gap);
            if Some(number) == current {
                row.push_str(&format!("{GREEN}{number:2}{RESET}"));
            } else if called.contains(&number) {
                row.push_str(&format!("{YELLOW}{number:2}{RESET}"));
            } else {
                row.push_str(&format!("{DIM}{number:2}{RESET}"));
            }
        }
        lines.push(row);
        for _ in 0..BOARDCONFIG.vletters_space {
            lines.push(String::new());
        }
    }
    lines
}

/// The last `n` numbers before the current one, most recent first
pub fn last_numbers(called: &[Number], n: usize) -> Vec<Number> {
    if called.len() <= 1 {
        return Vec::new();
    }
    let end = called.len() - 1;
    let start = end.saturating_sub(n);
    called[start..end].iter().rev().copied().collect()
}

pub fn format_status(state: SessionState, called: &[Number], can_check: bool) -> Vec<String> {
    let mut lines = Vec::new();
    match called.last() {
        Some(&number) => lines.push(format!("Last number: {GREEN}{}-{number}{RESET}", letter_for(number))),
        None => lines.push("Last number: -".to_string()),
    }
    let previous: Vec<String> = last_numbers(called, 3)
        .into_iter()
        .map(|n| format!("{}-{n}", letter_for(n)))
        .collect();
    lines.push(format!("Previous numbers: {}", previous.join(" ")));
    lines.push(format!("Called {} | state {state}", called.len()));

    let hint = match state {
        SessionState::Idle | SessionState::Exhausted => "Space start",
        SessionState::Running => "Space pause",
        SessionState::Paused => "Space resume",
    };
    let check = if can_check { "C check | " } else { "" };
    lines.push(format!("{hint} | {check}R reset | Q quit"));
    if state == SessionState::Exhausted {
        lines.push(format!("{YELLOW}All numbers have been called{RESET}"));
    }
    lines
}

pub fn describe_line(line: &CompletedLine) -> String {
    match line.kind {
        LineKind::Horizontal => format!("Row {}", line.index + 1),
        LineKind::Vertical => format!("Column {}", COLUMN_LETTERS[line.index]),
        LineKind::Diagonal if line.index == 0 => "Diagonal \\".to_string(),
        LineKind::Diagonal => "Diagonal /".to_string(),
        LineKind::Corners => "4 Corners".to_string(),
        LineKind::Middles => "4 Middles".to_string(),
    }
}

/// The checked card with matched and completed cells, followed by the verdict.
pub fn format_check(outcome: &CheckOutcome) -> Vec<String> {
    let evaluation = &outcome.evaluation;
    let mut lines = vec![format!("Card {}", evaluation.card_id)];
    lines.push(COLUMN_LETTERS.iter().map(|l| format!("{l:>5}")).collect());

    for r in 0..GRID_SIZE {
        let mut row = String::new();
        for c in 0..GRID_SIZE {
            let cell = if r == FREE_ROW && c == FREE_COL {
                "FREE".to_string()
            } else {
                match outcome.card.cell_text(r, c) {
                    "" => "-".to_string(),
                    text => text.to_string(),
                }
            };
            let cell = format!("{cell:>5}");
            if evaluation.completed_cells[r][c] {
                row.push_str(&format!("{GREEN}{cell}{RESET}"));
            } else if evaluation.matched_cells[r][c] {
                row.push_str(&format!("{YELLOW}{cell}{RESET}"));
            } else {
                row.push_str(&cell);
            }
        }
        lines.push(row);
    }

    lines.push(String::new());
    if evaluation.completed_lines.is_empty() {
        lines.push("Completed: none".to_string());
    } else {
        let names: Vec<String> = evaluation.completed_lines.iter().map(describe_line).collect();
        lines.push(format!("Completed: {}", names.join(", ")));
    }
    if evaluation.is_winner {
        lines.push(format!(
            "{GREEN}WINNER{RESET} ({} of {} lines)",
            evaluation.eligible_count, evaluation.required_lines
        ));
    } else {
        lines.push(format!(
            "{RED}Not a winner{RESET} ({} of {} lines)",
            evaluation.eligible_count, evaluation.required_lines
        ));
    }
    if outcome.paused {
        lines.push("Calling paused, Space to resume".to_string());
    }
    lines
}

/// Clear the screen and print the given sections. Uses CRLF so raw mode renders correctly.
pub fn show_on_terminal(sections: &[Vec<String>]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    write!(out, "\x1Bc")?; // Clear the screen
    for section in sections {
        for line in section {
            write!(out, "{line}\r\n")?;
        }
        write!(out, "\r\n")?;
    }
    out.flush()
}

/// Print a single message line without clearing the screen.
pub fn show_message(message: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    write!(out, "{message}\r\n")?;
    out.flush()
}
