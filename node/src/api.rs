//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the ledger over HTTP. All endpoints
//! share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                   | Description                          |
//! |--------|------------------------|--------------------------------------|
//! | GET    | `/health`              | Liveness probe                       |
//! | GET    | `/token`               | Token metadata and supply totals     |
//! | GET    | `/accounts/:address`   | Balance, withdrawable amount, lock   |
//! | GET    | `/locks/:address`      | Vesting lock of a beneficiary        |
//! | POST   | `/transfer`            | Plain transfer                       |
//! | POST   | `/vesting`             | Transfer that creates a vesting lock |
//! | POST   | `/unlock/:address`     | Release vested funds                 |
//! | GET    | `/ws`                  | WebSocket stream of transfer events  |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vesting_ledger::{
    AccountSnapshot, Address, AddressError, BalanceBook, Clock, ConfigError, LedgerConfig,
    LedgerError, NotifyError, SharedLedger, TransferEvent, TransferNotifier, VestingLedger,
    VestingLock,
};

use crate::metrics::SharedMetrics;

/// Ledger handle type served by the node.
pub type NodeLedger = SharedLedger<BalanceBook, BroadcastNotifier>;

// ---------------------------------------------------------------------------
// Event Broadcasting
// ---------------------------------------------------------------------------

/// Forwards accepted transfers to WebSocket subscribers.
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<TransferEvent>,
}

impl BroadcastNotifier {
    pub fn new(tx: broadcast::Sender<TransferEvent>) -> Self {
        Self { tx }
    }
}

impl TransferNotifier for BroadcastNotifier {
    fn notify_transfer(&self, event: &TransferEvent) -> Result<(), NotifyError> {
        // Having no subscribers is not a failure.
        if let Ok(receivers) = self.tx.send(event.clone()) {
            tracing::trace!(receivers, id = %event.id, "transfer event broadcast");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The ledger, serialized behind one mutex.
    pub ledger: NodeLedger,
    /// Broadcast channel for live transfer events.
    pub event_tx: broadcast::Sender<TransferEvent>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Builds the ledger from `config` and wires its notifier to a fresh
    /// broadcast channel of `capacity` events.
    pub fn from_config(
        config: &LedgerConfig,
        clock: Arc<dyn Clock>,
        metrics: SharedMetrics,
        version: impl Into<String>,
        capacity: usize,
    ) -> Result<Self, ConfigError> {
        let (event_tx, _) = broadcast::channel(capacity);
        let ledger = VestingLedger::from_config(config, BroadcastNotifier::new(event_tx.clone()))?;
        let state = Self {
            version: version.into(),
            ledger: SharedLedger::new(ledger, clock),
            event_tx,
            metrics,
        };
        state.refresh_gauges();
        Ok(state)
    }

    /// Copies ledger totals into the supply gauges.
    pub fn refresh_gauges(&self) {
        let (supply, locked, active) = self
            .ledger
            .read(|l| (l.total_supply(), l.total_locked(), l.active_locks()));
        self.metrics.observe_supply(supply, locked, active);
    }

    fn rejected(&self, err: LedgerError) -> ApiError {
        self.metrics.record_rejection(err.kind());
        if err.is_recoverable() {
            tracing::debug!(kind = err.kind(), "operation rejected: {}", err);
        } else {
            tracing::error!(kind = err.kind(), "ledger arithmetic failure: {}", err);
        }
        ApiError::Ledger(err)
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/token", get(token_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/locks/:address", get(lock_handler))
        .route("/transfer", post(transfer_handler))
        .route("/vesting", post(vesting_handler))
        .route("/unlock/:address", post(unlock_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /transfer`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender: Address,
    pub target: Address,
    pub amount: u64,
}

/// Body of `POST /vesting`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VestingRequest {
    pub sender: Address,
    pub beneficiary: Address,
    pub amount: u64,
    /// Length of one release period in days.
    pub duration_days: u32,
    /// Share of the original amount released per period, 1..=100.
    pub percent_per_period: u8,
}

/// Response payload for `GET /token`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: u64,
    pub locked_supply: u64,
    pub active_locks: usize,
}

/// Response payload for `POST /unlock/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UnlockResponse {
    pub beneficiary: Address,
    /// Amount released by this call.
    pub released: u64,
    /// Amount still restricted after the release.
    pub remaining_locked: u64,
}

/// Error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error kind, e.g. `LockedFundsExceeded`.
    pub kind: String,
}

/// Handler failure, rendered as an [`ErrorResponse`].
#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    BadAddress(AddressError),
    NotFound(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(err) => match err {
                LedgerError::InvalidTarget(_) | LedgerError::InvalidSchedule(_) => {
                    StatusCode::BAD_REQUEST
                }
                LedgerError::DuplicateSchedule(_)
                | LedgerError::UnlockNotOpen(_)
                | LedgerError::AlreadyReleased(_)
                | LedgerError::FullyUnlocked(_) => StatusCode::CONFLICT,
                LedgerError::InsufficientBalance { .. }
                | LedgerError::LockedFundsExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                LedgerError::Arithmetic(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadAddress(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Ledger(err) => err.kind(),
            ApiError::BadAddress(_) => "InvalidAddress",
            ApiError::NotFound(_) => "NotFound",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind().to_string();
        let error = match self {
            ApiError::Ledger(err) => err.to_string(),
            ApiError::BadAddress(err) => format!("invalid address: {}", err),
            ApiError::NotFound(msg) => msg,
        };
        (status, Json(ErrorResponse { error, kind })).into_response()
    }
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse().map_err(ApiError::BadAddress)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "version": state.version })),
    )
}

/// `GET /token`
async fn token_handler(State(state): State<AppState>) -> Json<TokenResponse> {
    let resp = state.ledger.read(|l| {
        let meta = l.metadata();
        TokenResponse {
            name: meta.name.clone(),
            symbol: meta.symbol.clone(),
            decimals: meta.decimals,
            total_supply: l.total_supply(),
            locked_supply: l.total_locked(),
            active_locks: l.active_locks(),
        }
    });
    Json(resp)
}

/// `GET /accounts/:address`. Unknown addresses report a zero balance.
async fn account_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AccountSnapshot>, ApiError> {
    let address = parse_address(&address)?;
    Ok(Json(state.ledger.snapshot(&address)))
}

/// `GET /locks/:address`
async fn lock_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<VestingLock>, ApiError> {
    let address = parse_address(&address)?;
    state
        .ledger
        .lock_of(&address)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no vesting lock for {}", address)))
}

/// `POST /transfer`
async fn transfer_handler(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<TransferEvent>, ApiError> {
    let timer = state.metrics.operation_latency_seconds.start_timer();
    let result = state.ledger.transfer(req.sender, req.target, req.amount);
    timer.observe_duration();

    let event = result.map_err(|e| state.rejected(e))?;
    state.metrics.transfers_total.inc();
    Ok(Json(event))
}

/// `POST /vesting`
async fn vesting_handler(
    State(state): State<AppState>,
    Json(req): Json<VestingRequest>,
) -> Result<(StatusCode, Json<VestingLock>), ApiError> {
    let timer = state.metrics.operation_latency_seconds.start_timer();
    let result = state.ledger.transfer_with_vesting(
        req.sender,
        req.beneficiary,
        req.amount,
        req.duration_days,
        req.percent_per_period,
    );
    timer.observe_duration();

    let lock = result.map_err(|e| state.rejected(e))?;
    state.metrics.vesting_transfers_total.inc();
    state.refresh_gauges();
    Ok((StatusCode::CREATED, Json(lock)))
}

/// `POST /unlock/:address`
async fn unlock_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UnlockResponse>, ApiError> {
    let beneficiary = parse_address(&address)?;

    let timer = state.metrics.operation_latency_seconds.start_timer();
    let result = state.ledger.unlock_with_remaining(beneficiary);
    timer.observe_duration();

    let (released, remaining_locked) = result.map_err(|e| state.rejected(e))?;
    state.metrics.unlocks_total.inc();
    state.refresh_gauges();

    Ok(Json(UnlockResponse {
        beneficiary,
        released,
        remaining_locked,
    }))
}

/// `GET /ws`: WebSocket upgrade for live transfer events.
///
/// Clients receive one JSON-encoded [`TransferEvent`] per accepted
/// transfer. Client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    forward_events(sink, stream, state.event_tx.subscribe()).await;
    tracing::debug!("ws subscriber disconnected");
}

/// Pushes broadcast events into `sink` until the client side of `stream`
/// closes or the channel is closed.
async fn forward_events<Si, St, E>(
    mut sink: Si,
    mut stream: St,
    mut rx: broadcast::Receiver<TransferEvent>,
) where
    Si: Sink<Message> + Unpin,
    St: Stream<Item = Result<Message, E>> + Unpin,
{
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if sink.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
