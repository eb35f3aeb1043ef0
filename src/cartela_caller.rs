// src/cartela_caller.rs
// Interactive bingo caller: bills the game with the retailer server, then reveals
// numbers on a timer and checks cards on demand.
//
// Interactive Controls:
// - SPACE: start, pause or resume calling
// - C: check a card (prompts for the card id)
// - R: reset to a fresh, uncalled game
// - ESC / Q: exit
//
// CLI Options:
// - --offline-ledger: bill against a local ledger file instead of the server

use std::sync::{Arc, Mutex};

use clap::Parser;
use cartela::billing::{BillingBackend, LocalBilling};
use cartela::caller::CallerSession;
use cartela::card::CardStore;
use cartela::clients::api_client::HttpBilling;
use cartela::config::{CallerConfig, parse_list};
use cartela::errors::GameError;
use cartela::ledger::{BillingRates, RetailerLedger};
use cartela::logging::{log_error_stderr, log_info};
use cartela::session::SessionState;
use cartela::terminal::{self, KeyAction};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

#[derive(Parser)]
#[command(name = env!("CARGO_BIN_NAME"))]
#[command(about = "Cartela caller - timed bingo calling with card checks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Cards JSON file, overrides conf/caller.conf
    #[arg(long)]
    cards: Option<String>,

    /// Comma separated ids of the cards playing this game
    #[arg(long)]
    active: Option<String>,

    /// Price of one card
    #[arg(long)]
    price: Option<f64>,

    /// Completed lines needed to win
    #[arg(long)]
    lines: Option<u32>,

    /// Retailer id sent to the billing server
    #[arg(long)]
    retailer: Option<String>,

    /// Billing server host
    #[arg(long)]
    host: Option<String>,

    /// Billing server port
    #[arg(long)]
    port: Option<u16>,

    /// Bill against this ledger file instead of the server
    #[arg(long)]
    offline_ledger: Option<String>,
}

fn apply_args(config: &mut CallerConfig, args: &Args) {
    if let Some(cards) = &args.cards {
        config.cards_path = cards.clone();
    }
    if let Some(active) = &args.active {
        config.active_cards = parse_list(active);
    }
    if let Some(price) = args.price {
        config.unit_price = price;
    }
    if let Some(lines) = args.lines {
        config.required_lines = lines.max(1);
    }
    if let Some(retailer) = &args.retailer {
        config.retailer_id = retailer.clone();
    }
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
}

fn render<B: BillingBackend>(caller: &CallerSession<B>, extra: Option<&Vec<String>>) {
    let controller = caller.controller();
    let called = controller.sequence().called();

    let mut header = vec![format!(
        "Balance {:.2} | one call every {}s",
        caller.runtime().balance,
        caller.call_interval().as_secs()
    )];
    if let Some(quote) = caller.quote() {
        header.push(format!(
            "Players {} | Gross {:.2} | Prize {:.2}",
            quote.player_count, quote.gross, quote.prize_pool
        ));
    }

    let mut sections = vec![
        header,
        terminal::format_board(called, controller.current_number()),
        terminal::format_status(controller.state(), called, controller.can_check()),
    ];
    if let Some(extra) = extra {
        sections.push(extra.clone());
    }
    if let Err(e) = terminal::show_on_terminal(&sections) {
        log_error_stderr(&format!("Failed to draw screen: {e}"));
    }
}

async fn toggle<B: BillingBackend>(caller: &mut CallerSession<B>) -> Result<(), GameError> {
    match caller.state() {
        SessionState::Idle | SessionState::Exhausted => caller.start().await.map(|_| ()),
        SessionState::Running => caller.pause(),
        SessionState::Paused => caller.resume(),
    }
}

async fn run<B: BillingBackend>(mut caller: CallerSession<B>) -> Result<(), GameError> {
    caller.initialize().await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let reader = terminal::spawn_key_reader(tx);

    let mut ticker = tokio::time::interval(caller.call_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut extra: Option<Vec<String>> = None;
    let mut prompting = false;
    render(&caller, extra.as_ref());

    loop {
        tokio::select! {
            _ = ticker.tick(), if caller.state() == SessionState::Running && !prompting => {
                if caller.tick().is_some() {
                    render(&caller, extra.as_ref());
                }
            }
            action = rx.recv() => {
                let Some(action) = action else { break };
                match action {
                    KeyAction::Toggle => match toggle(&mut caller).await {
                        Ok(()) => {
                            if caller.state() == SessionState::Running {
                                ticker.reset();
                            }
                            extra = None;
                        }
                        Err(e) => extra = Some(vec![format!("{e}")]),
                    },
                    KeyAction::CheckRequested => {
                        prompting = true;
                        if let Err(e) = terminal::show_message("Card id: ") {
                            log_error_stderr(&format!("Failed to draw prompt: {e}"));
                        }
                        continue;
                    }
                    KeyAction::CheckCard(card_id) => {
                        prompting = false;
                        extra = Some(match caller.check(&card_id) {
                            Ok(outcome) => terminal::format_check(&outcome),
                            Err(e) => vec![format!("Check failed: {e}")],
                        });
                    }
                    KeyAction::Reset => {
                        caller.reset().await;
                        extra = None;
                    }
                    KeyAction::Quit => break,
                }
                render(&caller, extra.as_ref());
            }
        }
    }

    drop(rx);
    if !matches!(tokio::task::spawn_blocking(move || reader.join()).await, Ok(Ok(()))) {
        log_error_stderr("Key reader did not shut down cleanly");
    }
    caller.finish().await;
    log_info("Caller stopped.");
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = CallerConfig::load_or_default();
    apply_args(&mut config, &args);

    let mut cards = CardStore::load_or_default(&config.cards_path);
    cards.set_active(&config.active_cards);
    log_info(&format!("{} cards loaded, {} active", cards.len(), cards.active_ids().len()));

    let result = match &args.offline_ledger {
        Some(path) => {
            let ledger = Arc::new(Mutex::new(RetailerLedger::load_or_default(path, BillingRates::default())));
            let billing = LocalBilling::new(Arc::clone(&ledger), Some(config.retailer_id.as_str()));
            let result = run(CallerSession::new(billing, cards, config.unit_price, config.required_lines)).await;
            match ledger.lock() {
                Ok(ledger) => {
                    if let Err(e) = ledger.save_to_file(path) {
                        log_error_stderr(&format!("Failed to save ledger: {e}"));
                    }
                }
                Err(_) => log_error_stderr("Failed to acquire ledger lock"),
            }
            result
        }
        None => match HttpBilling::new(&config) {
            Ok(billing) => run(CallerSession::new(billing, cards, config.unit_price, config.required_lines)).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        log_error_stderr(&format!("Caller stopped: {e}"));
        std::process::exit(1);
    }
}
