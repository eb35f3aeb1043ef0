// cartela/src/server.rs
// HTTP billing server: game quotes, game start/end bookkeeping and runtime settings per retailer.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode, body::Bytes};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;

use crate::billing::{EndGameRequest, EndReceipt, InitGameRequest, StartGameRequest};
use crate::config::ServerConfig;
use crate::errors::{AuthorizationError, GameError};
use crate::ledger::RetailerLedger;
use crate::logging::{log_error, log_error_stderr, log_info, log_warning};

pub const RETAILER_HEADER: &str = "X-Retailer-ID";

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

pub struct ServerState {
    pub ledger: Mutex<RetailerLedger>,
    pub config: ServerConfig,
}

impl ServerState {
    pub fn new(ledger: RetailerLedger, config: ServerConfig) -> Self {
        ServerState {
            ledger: Mutex::new(ledger),
            config,
        }
    }

    fn persist(&self, ledger: &RetailerLedger) {
        if self.config.ledger_path.is_empty() {
            return;
        }
        if let Err(e) = ledger.save_to_file(&self.config.ledger_path) {
            log_error(&format!("Failed to save ledger: {e}"));
        }
    }
}

pub fn start_server(config: ServerConfig, ledger: RetailerLedger) -> (tokio::task::JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown_signal);
    let state = Arc::new(ServerState::new(ledger, config.clone()));

    let handle = tokio::spawn(async move {
        let ip = config.host.parse::<std::net::IpAddr>().unwrap_or([127, 0, 0, 1].into());
        let addr = SocketAddr::from((ip, config.port));
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                log_error_stderr(&format!("Failed to start billing server: {e}"));
                return;
            }
        };
        log_info(&format!("Billing server listening on {addr}"));

        loop {
            if shutdown_clone.load(Ordering::Relaxed) {
                break;
            }

            // Accept with a timeout so the shutdown flag is noticed
            let accept_result = tokio::time::timeout(std::time::Duration::from_millis(100), listener.accept()).await;

            match accept_result {
                Ok(Ok((stream, _))) => {
                    let state = Arc::clone(&state);
                    let io = TokioIo::new(stream);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| handle_request(req, Arc::clone(&state)));
                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            log_error_stderr(&format!("Error serving connection: {err:?}"));
                        }
                    });
                }
                Ok(Err(e)) => {
                    log_error_stderr(&format!("Error accepting connection: {e}"));
                    break;
                }
                Err(_) => {}
            }
        }
        log_info("Billing server shutting down...");
    });

    (handle, shutdown_signal)
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let retailer_id = req
        .headers()
        .get(RETAILER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let body = match req.collect().await {
        Ok(body) => body.to_bytes(),
        Err(_) => {
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                "Failed to read request body",
                "input",
            ));
        }
    };

    Ok(dispatch(&method, &path, retailer_id.as_deref(), &body, &state))
}

/// Route a request with an already collected body.
pub fn dispatch(
    method: &Method,
    path: &str,
    retailer_id: Option<&str>,
    body: &[u8],
    state: &ServerState,
) -> Response<Full<Bytes>> {
    let result = match (method, path) {
        (&Method::GET, "/runtime") => with_ledger(state, |ledger| {
            ledger.runtime(retailer_id).map(|runtime| json_response(StatusCode::OK, &runtime))
        }),
        (&Method::POST, "/init") => parse_body::<InitGameRequest>(body).and_then(|request| {
            with_ledger(state, |ledger| {
                ledger
                    .quote(retailer_id, &request.active_cards, request.unit_price)
                    .map(|quote| json_response(StatusCode::OK, &quote))
            })
        }),
        (&Method::POST, "/start") => parse_body::<StartGameRequest>(body).and_then(|request| {
            with_ledger(state, |ledger| {
                let receipt = ledger.start(retailer_id, &request)?;
                state.persist(ledger);
                Ok(json_response(StatusCode::OK, &receipt))
            })
        }),
        (&Method::POST, "/end") => parse_body::<EndGameRequest>(body).and_then(|request| {
            with_ledger(state, |ledger| {
                let recorded = ledger.end(retailer_id, &request)?;
                if recorded {
                    state.persist(ledger);
                } else {
                    log_warning(&format!("Ignoring repeated end for {}", request.session_id));
                }
                Ok(json_response(StatusCode::OK, &EndReceipt { recorded }))
            })
        }),
        _ => {
            return error_response(StatusCode::NOT_FOUND, &format!("No route for {method} {path}"), "not_found");
        }
    };

    result.unwrap_or_else(|e| {
        if !matches!(e, GameError::Authorization(_)) {
            log_warning(&format!("{method} {path} rejected: {e}"));
        }
        error_response(status_for(&e), &e.to_string(), e.kind())
    })
}

fn with_ledger<T>(
    state: &ServerState,
    f: impl FnOnce(&mut RetailerLedger) -> Result<T, GameError>,
) -> Result<T, GameError> {
    let mut ledger = state
        .ledger
        .lock()
        .map_err(|_| GameError::Data("Failed to acquire ledger lock".to_string()))?;
    f(&mut ledger)
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, GameError> {
    serde_json::from_slice(body).map_err(|e| GameError::Data(format!("Invalid JSON in request body: {e}")))
}

pub fn status_for(error: &GameError) -> StatusCode {
    match error {
        GameError::Authorization(AuthorizationError::NotLoggedIn) => StatusCode::UNAUTHORIZED,
        GameError::Authorization(AuthorizationError::InsufficientRole) => StatusCode::FORBIDDEN,
        GameError::Balance(_) => StatusCode::PAYMENT_REQUIRED,
        GameError::Input(_) | GameError::Data(_) => StatusCode::BAD_REQUEST,
        GameError::Session(_) => StatusCode::CONFLICT,
        GameError::Network(_) => StatusCode::BAD_GATEWAY,
    }
}

fn build_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(hyper::header::CONTENT_TYPE, hyper::header::HeaderValue::from_static("application/json"));
    headers.insert(
        hyper::header::CACHE_CONTROL,
        hyper::header::HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    build_response(status, body)
}

fn error_response(status: StatusCode, message: &str, kind: &'static str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ErrorResponse {
            error: message.to_string(),
            kind,
        },
    )
}
