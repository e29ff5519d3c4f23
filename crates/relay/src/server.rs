//! Relay HTTP + WebSocket server
//!
//! Routes:
//! - `GET /healthz` → `ok`
//! - WebSocket upgrade on any other path (origin-checked); clients use
//!   `/ws` by default, bare-host URLs land on `/`
//! - any other request → 404 `not found`

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use contracts::{Clock, ContractError, RelayConfig, SystemClock};
use observability::metrics;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::connection::ConnectionIds;
use crate::coordinator::{LeadPolicy, StartCoordinator};
use crate::error::{RelayError, Result};
use crate::origin::OriginPolicy;
use crate::registry::RoomRegistry;
use crate::session::{run_session, CLOSE_POLICY_VIOLATION};

/// Frames above `max_message_bytes` but below this multiple of it still
/// reach the session and get a 1009 close; larger ones fail in the
/// transport and the connection is dropped without a close code.
const TRANSPORT_LIMIT_FACTOR: usize = 4;

/// Shared state accessible from axum handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub registry: Arc<RoomRegistry>,
    pub coordinator: Arc<StartCoordinator>,
    pub origins: Arc<OriginPolicy>,
    pub clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<ConnectionIds>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RelayConfig, clock: Arc<dyn Clock>) -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let coordinator = Arc::new(StartCoordinator::new(
            registry.clone(),
            clock.clone(),
            LeadPolicy::from_config(&config),
        ));
        Self {
            origins: Arc::new(OriginPolicy::new(config.allowed_origins.iter().cloned())),
            config: Arc::new(config),
            registry,
            coordinator,
            clock,
            ids: Arc::new(ConnectionIds::default()),
        }
    }
}

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .fallback(upgrade_or_not_found)
        .with_state(state)
}

/// A bound relay, ready to serve
pub struct RelayServer {
    listener: TcpListener,
    state: AppState,
}

impl RelayServer {
    /// Bind `config.bind_addr()` with the system clock.
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        Self::bind_with_state(AppState::new(config)).await
    }

    pub async fn bind_with_state(state: AppState) -> Result<Self> {
        let addr = state.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ContractError::bind(&addr, e.to_string()))?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr().map_err(ContractError::from)?)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!(
            %addr,
            min_lead_ms = self.state.config.min_lead_ms,
            allowed_origins = self.state.config.allowed_origins.len(),
            "LISTENING"
        );

        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(RelayError::Serve)?;

        info!("relay stopped");
        Ok(())
    }
}

/// Upgrade requests on any path; plain HTTP gets a 404.
async fn upgrade_or_not_found(
    upgrade: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    match upgrade {
        Ok(ws) => accept_upgrade(ws, &headers, state),
        Err(_) => not_found().await.into_response(),
    }
}

fn accept_upgrade(ws: WebSocketUpgrade, headers: &HeaderMap, state: AppState) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    if !state.origins.is_allowed(origin.as_deref()) {
        metrics::record_origin_rejected();
        warn!(origin = ?origin, "ORIGIN_REJECTED");
        return ws.on_upgrade(reject_origin);
    }

    let limit = state
        .config
        .max_message_bytes
        .saturating_mul(TRANSPORT_LIMIT_FACTOR);
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| run_session(socket, state))
}

async fn reject_origin(mut socket: WebSocket) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: CLOSE_POLICY_VIOLATION,
            reason: Utf8Bytes::from_static("Origin not allowed"),
        })))
        .await;
}

/// GET /healthz
async fn healthz() -> &'static str {
    "ok"
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}
