//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Wire contract snapshots
//! - Relay behaviour over real sockets (rooms, limits, origin policy)
//! - Full client/relay runs: sync, join, shared start, one GO each

#[cfg(test)]
mod contract_tests {
    use contracts::{ClientMessage, GosyncConfig, RoomId, ServerMessage};

    #[test]
    fn test_wire_shapes() {
        let start = ServerMessage::Start { start_at: 1_700_000_000_123 };
        assert_eq!(
            start.encode().unwrap(),
            r#"{"type":"START","startAt":1700000000123}"#
        );

        let joined = ServerMessage::Joined {
            room_id: RoomId::parse("r1").unwrap(),
        };
        assert_eq!(joined.encode().unwrap(), r#"{"type":"JOINED","roomId":"r1"}"#);

        assert_eq!(
            ClientMessage::decode(r#"{"type":"START_REQ","delayMs":"soon"}"#),
            Some(ClientMessage::StartReq { delay_ms: None })
        );
    }

    #[test]
    fn test_default_config_round_trips_through_loader() {
        let defaults = GosyncConfig::default();
        let toml = config_loader::ConfigLoader::to_toml(&defaults).unwrap();
        let parsed = config_loader::ConfigLoader::load_from_str(
            &toml,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(parsed, defaults);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use client::{ClientEvent, SyncClient};
    use contracts::{ClientConfig, Clock, EstimatorConfig, RelayConfig, RoomId};
    use futures::{SinkExt, StreamExt};
    use relay::{AppState, RelayServer};
    use serde_json::{json, Value};
    use tokio::net::TcpStream;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::sync::oneshot;
    use tokio::time::{sleep, timeout, Instant};
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::http::HeaderValue;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

    type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct TestRelay {
        addr: SocketAddr,
        state: AppState,
        _shutdown: oneshot::Sender<()>,
    }

    impl TestRelay {
        fn url(&self) -> String {
            format!("ws://{}/ws", self.addr)
        }
    }

    fn relay_config() -> RelayConfig {
        RelayConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Default::default()
        }
    }

    async fn spawn_relay(config: RelayConfig) -> TestRelay {
        let server = RelayServer::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let state = server.state().clone();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(server.run(async move {
            let _ = rx.await;
        }));
        TestRelay {
            addr,
            state,
            _shutdown: tx,
        }
    }

    async fn connect(relay: &TestRelay) -> Ws {
        let (ws, _) = tokio_tungstenite::connect_async(relay.url()).await.unwrap();
        ws
    }

    async fn send_json(ws: &mut Ws, value: Value) {
        ws.send(Message::text(value.to_string())).await.unwrap();
    }

    /// Next text frame as JSON, skipping control frames
    async fn recv_json(ws: &mut Ws) -> Value {
        loop {
            let msg = timeout(TIMEOUT, ws.next())
                .await
                .expect("timed out waiting for frame")
                .expect("stream ended")
                .expect("websocket error");
            if let Message::Text(text) = msg {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    /// Close code of the next close frame
    async fn recv_close_code(ws: &mut Ws) -> u16 {
        loop {
            let msg = timeout(TIMEOUT, ws.next())
                .await
                .expect("timed out waiting for close")
                .expect("stream ended before close")
                .expect("websocket error");
            if let Message::Close(frame) = msg {
                return frame.map(|f| u16::from(f.code)).unwrap_or_default();
            }
        }
    }

    async fn expect_silence(ws: &mut Ws, window: Duration) {
        if let Ok(Some(Ok(Message::Text(text)))) = timeout(window, ws.next()).await {
            panic!("unexpected frame {text}");
        }
    }

    async fn join(ws: &mut Ws, room: &str) {
        send_json(ws, json!({"type": "JOIN", "roomId": room})).await;
        let reply = recv_json(ws).await;
        assert_eq!(reply, json!({"type": "JOINED", "roomId": room}));
    }

    async fn wait_for(mut check: impl FnMut() -> bool) {
        let deadline = Instant::now() + TIMEOUT;
        while !check() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            sleep(Duration::from_millis(10)).await;
        }
    }

    fn now_ms() -> i64 {
        contracts::SystemClock.now_ms()
    }

    #[tokio::test]
    async fn test_ping_is_echoed_with_server_time() {
        let relay = spawn_relay(relay_config()).await;
        let mut ws = connect(&relay).await;

        let before = now_ms();
        send_json(&mut ws, json!({"type": "PING", "t0": 42})).await;
        let pong = recv_json(&mut ws).await;
        assert_eq!(pong["type"], "PONG");
        assert_eq!(pong["t0"], 42);
        let t1 = pong["t1"].as_i64().unwrap();
        assert!(t1 >= before && t1 <= now_ms());
    }

    #[tokio::test]
    async fn test_start_reaches_every_member_of_the_room_only() {
        let relay = spawn_relay(relay_config()).await;
        let mut a = connect(&relay).await;
        let mut b = connect(&relay).await;
        let mut other = connect(&relay).await;
        join(&mut a, "r1").await;
        join(&mut b, "r1").await;
        join(&mut other, "r2").await;

        let requested_at = now_ms();
        send_json(&mut a, json!({"type": "START_REQ", "delayMs": 1000})).await;

        let start_a = recv_json(&mut a).await;
        let start_b = recv_json(&mut b).await;
        assert_eq!(start_a["type"], "START");
        assert_eq!(start_a, start_b);

        let start_at = start_a["startAt"].as_i64().unwrap();
        assert!(start_at >= requested_at + 1000);
        assert!(start_at <= now_ms() + 1000);

        expect_silence(&mut other, Duration::from_millis(200)).await;
    }

    #[tokio::test]
    async fn test_short_delay_is_raised_to_min_lead() {
        let relay = spawn_relay(RelayConfig {
            min_lead_ms: 400,
            ..relay_config()
        })
        .await;
        let mut ws = connect(&relay).await;
        join(&mut ws, "r1").await;

        let requested_at = now_ms();
        send_json(&mut ws, json!({"type": "START_REQ", "delayMs": -50})).await;
        let start = recv_json(&mut ws).await;
        assert!(start["startAt"].as_i64().unwrap() >= requested_at + 400);
    }

    #[tokio::test]
    async fn test_start_outside_room_and_garbage_are_ignored() {
        let relay = spawn_relay(relay_config()).await;
        let mut ws = connect(&relay).await;

        send_json(&mut ws, json!({"type": "START_REQ", "delayMs": 500})).await;
        ws.send(Message::text("not json")).await.unwrap();
        send_json(&mut ws, json!({"type": "DANCE"})).await;
        expect_silence(&mut ws, Duration::from_millis(200)).await;

        // the connection survives
        send_json(&mut ws, json!({"type": "PING", "t0": 1})).await;
        assert_eq!(recv_json(&mut ws).await["type"], "PONG");
    }

    #[tokio::test]
    async fn test_start_requests_are_rate_limited() {
        let relay = spawn_relay(relay_config()).await;
        let mut ws = connect(&relay).await;
        join(&mut ws, "r1").await;

        for _ in 0..7 {
            send_json(&mut ws, json!({"type": "START_REQ", "delayMs": 1000})).await;
        }

        let mut starts = 0;
        while let Ok(Some(Ok(msg))) = timeout(Duration::from_millis(300), ws.next()).await {
            if matches!(msg, Message::Text(_)) {
                starts += 1;
            }
        }
        assert_eq!(starts, 5);
    }

    #[tokio::test]
    async fn test_switching_rooms_and_disconnect_clean_up() {
        let relay = spawn_relay(relay_config()).await;
        let registry = relay.state.registry.clone();

        let mut ws = connect(&relay).await;
        join(&mut ws, "r1").await;
        join(&mut ws, "r2").await;
        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.members_of(&RoomId::parse("r2").unwrap()).len(), 1);

        ws.close(None).await.unwrap();
        drop(ws);
        wait_for(|| registry.room_count() == 0 && registry.member_count() == 0).await;
    }

    #[tokio::test]
    async fn test_oversized_message_closes_with_1009() {
        let relay = spawn_relay(relay_config()).await;
        let mut ws = connect(&relay).await;

        let big = "x".repeat(relay_config().max_message_bytes + 1);
        ws.send(Message::text(big)).await.unwrap();
        assert_eq!(recv_close_code(&mut ws).await, 1009);
    }

    #[tokio::test]
    async fn test_disallowed_origin_closes_with_1008() {
        let relay = spawn_relay(RelayConfig {
            allowed_origins: vec!["https://show.example".to_string()],
            ..relay_config()
        })
        .await;

        let mut request = relay.url().into_client_request().unwrap();
        request
            .headers_mut()
            .insert("Origin", HeaderValue::from_static("https://evil.example"));
        let (mut rejected, _) = tokio_tungstenite::connect_async(request).await.unwrap();
        assert_eq!(recv_close_code(&mut rejected).await, 1008);

        let mut request = relay.url().into_client_request().unwrap();
        request
            .headers_mut()
            .insert("Origin", HeaderValue::from_static("https://show.example"));
        let (mut accepted, _) = tokio_tungstenite::connect_async(request).await.unwrap();
        join(&mut accepted, "r1").await;
    }

    #[tokio::test]
    async fn test_upgrade_accepted_on_any_path() {
        let relay = spawn_relay(relay_config()).await;
        for url in [
            format!("ws://{}", relay.addr),
            format!("ws://{}/lobby", relay.addr),
        ] {
            let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
            join(&mut ws, "r1").await;
        }
    }

    #[tokio::test]
    async fn test_frame_beyond_transport_limit_drops_connection() {
        let relay = spawn_relay(relay_config()).await;
        let registry = relay.state.registry.clone();
        let mut ws = connect(&relay).await;
        join(&mut ws, "r1").await;

        let huge = "x".repeat(relay_config().max_message_bytes * 4 + 1);
        ws.send(Message::text(huge)).await.unwrap();

        // no 1009 at this size: the transport aborts the read and the
        // socket is torn down
        loop {
            match timeout(TIMEOUT, ws.next()).await.expect("socket left open") {
                Some(Ok(Message::Text(text))) => panic!("unexpected frame {text}"),
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.map(|f| u16::from(f.code));
                    assert_ne!(code, Some(1009));
                    break;
                }
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => break,
            }
        }
        wait_for(|| registry.member_count() == 0).await;
    }

    #[tokio::test]
    async fn test_healthz_over_http() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let relay = spawn_relay(relay_config()).await;
        let mut stream = TcpStream::connect(relay.addr).await.unwrap();
        stream
            .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        timeout(TIMEOUT, stream.read_to_string(&mut response))
            .await
            .unwrap()
            .unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.ends_with("ok"));
    }

    fn client_config(server_url: String) -> ClientConfig {
        ClientConfig {
            server_url,
            estimator: EstimatorConfig {
                probe_count: 4,
                probe_spacing_ms: 5,
                grace_ms: 50,
                resync_interval_ms: 60_000,
            },
            ..Default::default()
        }
    }

    async fn next_event(events: &mut UnboundedReceiver<ClientEvent>) -> ClientEvent {
        timeout(TIMEOUT, events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    /// Drain events until `Go`, returning the scheduled start and how many
    /// `Go` events were seen within a short window afterwards.
    async fn run_until_go(events: &mut UnboundedReceiver<ClientEvent>) -> (i64, usize) {
        let mut scheduled = None;
        loop {
            match next_event(events).await {
                ClientEvent::StartScheduled { start_at } => scheduled = Some(start_at),
                ClientEvent::Go { start_at, late_ms } => {
                    assert_eq!(Some(start_at), scheduled);
                    assert!(late_ms >= 0.0);
                    break;
                }
                _ => {}
            }
        }

        let mut extra = 0;
        while let Ok(Some(event)) = timeout(Duration::from_millis(200), events.recv()).await {
            if matches!(event, ClientEvent::Go { .. }) {
                extra += 1;
            }
        }
        (scheduled.unwrap_or_default(), 1 + extra)
    }

    async fn wait_joined(events: &mut UnboundedReceiver<ClientEvent>) {
        loop {
            if let ClientEvent::Joined { room_id } = next_event(events).await {
                assert_eq!(room_id, "r1");
                return;
            }
        }
    }

    #[tokio::test]
    async fn test_clients_fire_once_at_shared_instant() {
        let relay = spawn_relay(relay_config()).await;

        let spawn_client = || SyncClient::new(client_config(relay.url())).unwrap().spawn();
        let (alice, mut alice_events) = spawn_client();
        let (bob, mut bob_events) = spawn_client();
        let room = RoomId::parse("r1").unwrap();
        alice.join(room.clone()).await.unwrap();
        bob.join(room).await.unwrap();
        wait_joined(&mut alice_events).await;
        wait_joined(&mut bob_events).await;

        alice.start(Some(600.0)).await.unwrap();

        let ((alice_at, alice_go), (bob_at, bob_go)) =
            tokio::join!(run_until_go(&mut alice_events), run_until_go(&mut bob_events));
        assert_eq!(alice_at, bob_at);
        assert_eq!(alice_go, 1);
        assert_eq!(bob_go, 1);
        assert!(now_ms() >= alice_at);

        let summary = alice.shutdown().await.unwrap();
        assert!(summary.rounds_updated >= 1);
        bob.shutdown().await.unwrap();
    }
}
