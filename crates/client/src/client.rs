//! SyncClient - WebSocket event loop
//!
//! One task owns the socket, the estimator, the countdown and the
//! reconnect policy. All timers are deadlines polled from a single
//! `select!`, so nothing mutates client state concurrently.
//!
//! Per connection:
//! 1. Run an estimation round right away
//! 2. Send `JOIN` for the remembered room once that round closes
//! 3. Re-estimate every `resync_interval_ms`
//!
//! A countdown is tied to the client, not the connection: it keeps running
//! through reconnects with the last known offset.

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    probe_key, ClientConfig, ClientMessage, Clock, RoomId, ServerMessage, SystemClock,
};
use futures::future::BoxFuture;
use futures::stream::{SplitSink, SplitStream};
use futures::{FutureExt, SinkExt, StreamExt};
use observability::{metrics, SessionStats, SessionSummary};
use sync_engine::{
    ClockOffsetEstimator, CountdownScheduler, CountdownToken, NextStep, Phase, ReplyOutcome,
    RoundId, RoundOutcome, Step,
};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

use crate::error::{ClientError, Result};
use crate::event::{ClientCommand, ClientEvent};
use crate::reconnect::ReconnectPolicy;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ConnectFuture = BoxFuture<'static, std::result::Result<WsStream, tungstenite::Error>>;

/// Upper bound on a single connection attempt
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Check that `raw` is a `ws://` or `wss://` URL.
pub fn parse_server_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ClientError::InvalidUrl {
            url: raw.to_string(),
            message: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Sync client, configured but not yet running
pub struct SyncClient {
    config: ClientConfig,
    url: Url,
    clock: Arc<dyn Clock>,
}

impl SyncClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ClientConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let url = parse_server_url(&config.server_url)?;
        Ok(Self { config, url, clock })
    }

    /// Spawn the event loop on the current runtime.
    pub fn spawn(self) -> (ClientHandle, mpsc::UnboundedReceiver<ClientEvent>) {
        let (command_tx, command_rx) = mpsc::channel(self.config.command_queue_capacity);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(EventLoop::new(self, command_rx, event_tx).run());
        (
            ClientHandle {
                commands: command_tx,
                task,
            },
            event_rx,
        )
    }
}

/// Control handle for a running client
pub struct ClientHandle {
    commands: mpsc::Sender<ClientCommand>,
    task: JoinHandle<Result<SessionSummary>>,
}

impl ClientHandle {
    pub async fn send(&self, command: ClientCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::Stopped)
    }

    pub async fn join(&self, room_id: RoomId) -> Result<()> {
        self.send(ClientCommand::Join(room_id)).await
    }

    pub async fn start(&self, delay_ms: Option<f64>) -> Result<()> {
        self.send(ClientCommand::Start { delay_ms }).await
    }

    /// Stop the client and collect its session statistics.
    pub async fn shutdown(self) -> Result<SessionSummary> {
        let _ = self.commands.send(ClientCommand::Shutdown).await;
        self.task
            .await
            .map_err(|e| ClientError::Task(e.to_string()))?
    }
}

struct Link {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
    /// First estimation round on this connection has closed
    synced: bool,
}

#[derive(Debug, Clone, Copy)]
enum RoundTimer {
    Probe,
    Close,
}

struct EventLoop {
    url: Url,
    clock: Arc<dyn Clock>,
    estimator: ClockOffsetEstimator,
    countdown: CountdownScheduler,
    reconnect: ReconnectPolicy,
    stats: SessionStats,
    commands: mpsc::Receiver<ClientCommand>,
    events: mpsc::UnboundedSender<ClientEvent>,

    link: Option<Link>,
    connecting: Option<ConnectFuture>,
    desired_room: Option<RoomId>,
    last_phase: Option<Phase>,

    round_timer: Option<(RoundId, RoundTimer, Instant)>,
    resync_at: Option<Instant>,
    countdown_at: Option<(CountdownToken, Instant)>,
    reconnect_at: Option<Instant>,
}

impl EventLoop {
    fn new(
        client: SyncClient,
        commands: mpsc::Receiver<ClientCommand>,
        events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Self {
        let SyncClient { config, url, clock } = client;
        Self {
            url,
            clock,
            estimator: ClockOffsetEstimator::new(config.estimator),
            countdown: CountdownScheduler::new(config.countdown),
            reconnect: ReconnectPolicy::new(config.reconnect),
            stats: SessionStats::new(),
            commands,
            events,
            link: None,
            connecting: None,
            desired_room: None,
            last_phase: None,
            round_timer: None,
            resync_at: None,
            countdown_at: None,
            reconnect_at: None,
        }
    }

    #[instrument(name = "sync_client", skip_all, fields(url = %self.url))]
    async fn run(mut self) -> Result<SessionSummary> {
        self.start_connect();

        loop {
            tokio::select! {
                biased;

                _ = sleep_opt(self.countdown_at.map(|(_, at)| at)) => {
                    if let Some((token, _)) = self.countdown_at.take() {
                        self.poll_countdown(token);
                    }
                }
                command = self.commands.recv() => match command {
                    Some(ClientCommand::Shutdown) | None => break,
                    Some(command) => self.on_command(command).await,
                },
                result = connect_ready(&mut self.connecting) => {
                    self.connecting = None;
                    match result {
                        Ok(ws) => self.on_connected(ws),
                        Err(e) => {
                            warn!(error = %e, "connect failed");
                            self.schedule_reconnect();
                        }
                    }
                }
                frame = next_frame(&mut self.link) => self.on_frame(frame).await,
                _ = sleep_opt(self.round_timer.map(|(_, _, at)| at)) => {
                    if let Some((round, timer, _)) = self.round_timer.take() {
                        self.on_round_timer(round, timer).await;
                    }
                }
                _ = sleep_opt(self.resync_at) => {
                    self.resync_at = None;
                    self.begin_round();
                }
                _ = sleep_opt(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.start_connect();
                }
            }
        }

        self.close().await;
        let summary = self.stats.summary();
        info!("client stopped");
        Ok(summary)
    }

    // ===== Connection =====

    fn start_connect(&mut self) {
        debug!("connecting");
        let url = self.url.to_string();
        self.connecting = Some(
            async move {
                match tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url)).await {
                    Ok(result) => result.map(|(ws, _response)| ws),
                    Err(_) => Err(tungstenite::Error::Io(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "connect timed out",
                    ))),
                }
            }
            .boxed(),
        );
    }

    fn on_connected(&mut self, ws: WsStream) {
        self.reconnect.reset();
        let (sink, stream) = ws.split();
        self.link = Some(Link {
            sink,
            stream,
            synced: false,
        });
        info!("connected");
        self.emit(ClientEvent::Connected {
            url: self.url.to_string(),
        });
        self.begin_round();
    }

    fn on_disconnect(&mut self) {
        if self.link.take().is_none() {
            return;
        }
        self.estimator.abort_round();
        self.round_timer = None;
        self.resync_at = None;
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        let delay = self.reconnect.next_delay();
        self.stats.record_reconnect();
        metrics::record_reconnect(self.reconnect.attempts());
        self.reconnect_at = Some(Instant::now() + delay);
        info!(retry_in_ms = delay.as_millis() as u64, "reconnect scheduled");
        self.emit(ClientEvent::Disconnected { retry_in: delay });
    }

    async fn close(&mut self) {
        self.countdown.cancel();
        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.sink.close().await {
                debug!(error = %e, "close handshake failed");
            }
        }
    }

    async fn send(&mut self, message: &ClientMessage) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        let text = match message.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "failed to encode message");
                return;
            }
        };
        if let Err(e) = link.sink.send(Message::text(text)).await {
            warn!(error = %e, "send failed");
            self.on_disconnect();
        }
    }

    // ===== Inbound =====

    async fn on_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::Join(room_id) => {
                self.desired_room = Some(room_id.clone());
                if self.link.as_ref().is_some_and(|link| link.synced) {
                    self.send(&ClientMessage::Join { room_id }).await;
                } else {
                    debug!(room_id = %room_id, "join deferred until clock sync");
                }
            }
            ClientCommand::Start { delay_ms } => {
                if self.link.is_none() {
                    warn!("not connected, start request dropped");
                    return;
                }
                self.send(&ClientMessage::StartReq { delay_ms }).await;
            }
            ClientCommand::Shutdown => {}
        }
    }

    async fn on_frame(&mut self, frame: Option<std::result::Result<Message, tungstenite::Error>>) {
        let message = match frame {
            Some(Ok(Message::Text(text))) => ServerMessage::decode(text.as_str()),
            Some(Ok(Message::Binary(data))) => std::str::from_utf8(&data)
                .ok()
                .and_then(ServerMessage::decode),
            Some(Ok(Message::Close(frame))) => {
                info!(?frame, "server closed connection");
                self.on_disconnect();
                return;
            }
            Some(Ok(_)) => return,
            Some(Err(e)) => {
                warn!(error = %e, "connection lost");
                self.on_disconnect();
                return;
            }
            None => {
                info!("connection ended");
                self.on_disconnect();
                return;
            }
        };

        let Some(message) = message else {
            trace!("dropping malformed server message");
            return;
        };

        match message {
            ServerMessage::Pong { t0, t1 } => {
                let Some(t0) = probe_key(&t0) else {
                    trace!(%t0, "pong for a t0 this client never sent");
                    return;
                };
                if let ReplyOutcome::Accepted(sample) =
                    self.estimator.record_reply(t0, t1, self.clock.now_ms())
                {
                    trace!(rtt = sample.rtt, offset = sample.offset, "probe sample");
                }
            }
            ServerMessage::Joined { room_id } => {
                info!(room_id = %room_id, "joined room");
                self.emit(ClientEvent::Joined { room_id });
            }
            ServerMessage::Start { start_at } => {
                let token = self.countdown.arm(start_at);
                self.last_phase = None;
                info!(start_at, offset_ms = self.estimator.offset_ms(), "start scheduled");
                self.emit(ClientEvent::StartScheduled { start_at });
                self.poll_countdown(token);
            }
        }
    }

    // ===== Estimation =====

    fn begin_round(&mut self) {
        if self.link.is_none() {
            return;
        }
        let round = self.estimator.begin_round();
        self.round_timer = Some((round, RoundTimer::Probe, Instant::now()));
    }

    async fn on_round_timer(&mut self, round: RoundId, timer: RoundTimer) {
        match timer {
            RoundTimer::Probe => {
                let Some(probe) = self.estimator.issue_probe(round, self.clock.now_ms()) else {
                    return;
                };
                self.send(&ClientMessage::Ping { t0: probe.t0.into() }).await;
                if self.link.is_none() {
                    return;
                }
                let now = Instant::now();
                self.round_timer = Some(match probe.next {
                    NextStep::Probe(delay) => (round, RoundTimer::Probe, now + delay),
                    NextStep::Close(delay) => (round, RoundTimer::Close, now + delay),
                });
            }
            RoundTimer::Close => self.finish_round(round).await,
        }
    }

    async fn finish_round(&mut self, round: RoundId) {
        let (offset_ms, best_rtt_ms, samples) = match self.estimator.finish_round(round) {
            RoundOutcome::Updated {
                offset_ms,
                best_rtt_ms,
                samples,
            } => {
                self.stats.record_update(offset_ms, best_rtt_ms);
                (offset_ms, Some(best_rtt_ms), samples)
            }
            RoundOutcome::Retained { offset_ms } => {
                self.stats.record_retained();
                (offset_ms, None, 0)
            }
            RoundOutcome::Stale => return,
        };

        info!(offset_ms, best_rtt_ms = ?best_rtt_ms, samples, "clock offset estimated");
        self.emit(ClientEvent::Synced {
            offset_ms,
            best_rtt_ms,
            samples,
        });
        self.resync_at = Some(Instant::now() + self.estimator.resync_interval());

        // re-evaluate a running countdown against the new offset
        if let Some((token, _)) = self.countdown_at {
            self.countdown_at = Some((token, Instant::now()));
        }

        let first_sync = match self.link.as_mut() {
            Some(link) => !std::mem::replace(&mut link.synced, true),
            None => false,
        };
        if first_sync {
            if let Some(room_id) = self.desired_room.clone() {
                self.send(&ClientMessage::Join { room_id }).await;
            }
        }
    }

    // ===== Countdown =====

    fn poll_countdown(&mut self, token: CountdownToken) {
        let start_at = self.countdown.armed().map(|(_, at)| at);
        match self
            .countdown
            .poll(token, self.clock.now_ms(), self.estimator.offset_ms())
        {
            Step::Fire { late_ms } => {
                self.countdown_at = None;
                self.last_phase = None;
                self.stats.record_go(late_ms);
                metrics::record_go(late_ms);
                let start_at = start_at.unwrap_or_default();
                info!(start_at, late_ms, "GO");
                self.emit(ClientEvent::Go { start_at, late_ms });
            }
            Step::Wait {
                phase,
                delay,
                remaining_ms,
            } => {
                self.countdown_at = Some((token, Instant::now() + delay));
                if phase == Phase::Coarse || self.last_phase != Some(Phase::Fine) {
                    self.emit(ClientEvent::Countdown {
                        remaining_ms,
                        phase,
                    });
                }
                self.last_phase = Some(phase);
            }
            Step::Stale => {}
        }
    }

    fn emit(&self, event: ClientEvent) {
        if self.events.send(event).is_err() {
            trace!("event receiver dropped");
        }
    }
}

async fn sleep_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn connect_ready(
    connecting: &mut Option<ConnectFuture>,
) -> std::result::Result<WsStream, tungstenite::Error> {
    match connecting {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn next_frame(
    link: &mut Option<Link>,
) -> Option<std::result::Result<Message, tungstenite::Error>> {
    match link {
        Some(link) => link.stream.next().await,
        None => std::future::pending().await,
    }
}
