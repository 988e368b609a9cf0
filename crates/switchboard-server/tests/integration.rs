//! End-to-end tests over real WebSocket connections.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use switchboard_core::constants::BRIDGE_SERVICE_MODULE;
use switchboard_core::{HubError, Role};
use switchboard_protocol::Envelope;
use switchboard_server::{Hub, LocalRuntime, PageStateModule, ServerConfig, SwitchboardServer};
use switchboard_settings::ToolSettings;

const TIMEOUT: Duration = Duration::from_secs(5);
const SECRET: &str = "s3cret";

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct TestHub {
    addr: SocketAddr,
    server: SwitchboardServer,
    runtime: Arc<LocalRuntime>,
    pages: Arc<PageStateModule>,
}

impl TestHub {
    fn hub(&self) -> &Arc<Hub> {
        self.server.hub()
    }

    fn url(&self, role: Role) -> String {
        format!("ws://{}/{}/key={SECRET}", self.addr, role.path_segment())
    }

    async fn connect(&self, role: Role) -> WsStream {
        let (ws, _) = timeout(TIMEOUT, connect_async(self.url(role)))
            .await
            .expect("connect timed out")
            .expect("handshake failed");
        ws
    }
}

async fn boot() -> TestHub {
    let runtime = Arc::new(LocalRuntime::new(ToolSettings::default()));
    let pages = Arc::new(PageStateModule::new());
    runtime.register_module(BRIDGE_SERVICE_MODULE, pages.clone());

    let config = ServerConfig {
        shared_secret: SECRET.into(),
        ..ServerConfig::default()
    };
    let hub = Arc::new(Hub::new(runtime.clone(), config.internal_tools.clone()));
    let server = SwitchboardServer::new(config, hub);
    let (addr, _handle) = server.listen().await.unwrap();
    TestHub {
        addr,
        server,
        runtime,
        pages,
    }
}

async fn send(ws: &mut WsStream, frame: Value) {
    ws.send(Message::text(frame.to_string())).await.unwrap();
}

/// Next text frame, skipping control frames.
async fn recv(ws: &mut WsStream) -> Envelope {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("no frame before timeout")
            .expect("stream ended")
            .expect("transport error");
        if let Message::Text(text) = msg {
            return Envelope::parse(text.as_str()).unwrap();
        }
    }
}

/// Assert no text frame arrives within `window`.
async fn assert_silent(ws: &mut WsStream, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Text(text)))) => panic!("unexpected frame: {}", text.as_str()),
            Ok(Some(Ok(_))) => {}
            Ok(other) => panic!("stream ended: {other:?}"),
        }
    }
}

async fn eventually(what: &str, cond: impl Fn() -> bool) {
    let start = tokio::time::Instant::now();
    while !cond() {
        assert!(start.elapsed() < TIMEOUT, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn data(env: &Envelope) -> &Value {
    env.data.as_ref().expect("frame has data")
}

// ── Gateway ─────────────────────────────────────────────────────────

#[tokio::test]
async fn bad_secret_and_unmatched_path_are_refused() {
    let t = boot().await;

    let err = connect_async(format!("ws://{}/log-subscriber/key=wrong", t.addr))
        .await
        .unwrap_err();
    assert_matches!(err, tungstenite::Error::Http(ref resp) if resp.status() == 401);

    let err = connect_async(format!("ws://{}/nowhere/key={SECRET}", t.addr))
        .await
        .unwrap_err();
    assert_matches!(err, tungstenite::Error::Http(ref resp) if resp.status() == 404);

    let err = connect_async(format!("ws://{}/dashboard/key=", t.addr))
        .await
        .unwrap_err();
    assert_matches!(err, tungstenite::Error::Http(ref resp) if resp.status() == 401);

    assert_eq!(t.hub().connection_count(), 0);
}

#[tokio::test]
async fn every_role_connects_and_only_subscribers_get_ack() {
    let t = boot().await;
    let mut sockets = Vec::new();
    for role in Role::ALL {
        let mut ws = t.connect(role).await;
        if role.receives_ack() {
            let ack = recv(&mut ws).await;
            assert_eq!(ack.frame_type, "connection_ack");
        }
        sockets.push((role, ws));
    }
    eventually("all six registered", || t.hub().connection_count() == 6).await;
    for role in Role::ALL {
        assert_eq!(t.hub().role_counts()[&role], 1);
    }
    for (role, ws) in &mut sockets {
        if !role.receives_ack() {
            assert_silent(ws, Duration::from_millis(100)).await;
        }
    }
}

// ── Distributed servers ─────────────────────────────────────────────

#[tokio::test]
async fn register_tools_hides_internal_names() {
    let t = boot().await;
    let mut srv = t.connect(Role::DistributedServer).await;
    send(
        &mut srv,
        json!({"type": "register_tools", "data": {"tools": ["search", "internal_request_file"]}}),
    )
    .await;

    eventually("tools registered", || !t.hub().exposed_tools().is_empty()).await;
    let exposed: Vec<String> = t.hub().exposed_tools().into_iter().collect();
    assert_eq!(exposed, vec!["search"]);
    let runtime_tools: Vec<String> = t.runtime.distributed_tool_names().into_iter().collect();
    assert_eq!(runtime_tools, vec!["search"]);
}

#[tokio::test]
async fn call_round_trip_by_name() {
    let t = boot().await;
    let mut srv = t.connect(Role::DistributedServer).await;
    send(
        &mut srv,
        json!({"type": "report_ip", "data": {"localIPs": ["10.1.1.7"], "publicIP": "203.0.113.9", "serverName": "srv1"}}),
    )
    .await;
    eventually("identity reported", || {
        t.hub().server_for_ip("203.0.113.9").as_deref() == Some("srv1")
    })
    .await;

    let node = tokio::spawn(async move {
        let frame = recv(&mut srv).await;
        assert_eq!(frame.frame_type, "execute_tool");
        let d = data(&frame);
        assert_eq!(d["toolName"], "search");
        assert_eq!(d["toolArgs"]["q"], "x");
        let reply = json!({
            "type": "tool_result",
            "data": {"requestId": d["requestId"], "status": "success", "result": {"hits": ["a", "b"]}}
        });
        send(&mut srv, reply).await;
        srv
    });

    let value = t
        .hub()
        .call("srv1", "search", json!({"q": "x"}), Some(TIMEOUT))
        .await
        .unwrap();
    assert_eq!(value, json!({"hits": ["a", "b"]}));
    assert_eq!(t.hub().pending_calls(), 0);
    let _srv = node.await.unwrap();
}

#[tokio::test]
async fn remote_error_rejects_call() {
    let t = boot().await;
    let mut srv = t.connect(Role::DistributedServer).await;
    eventually("server registered", || t.hub().distributed_servers().len() == 1).await;
    let server_id = t.hub().distributed_servers()[0].server_id.clone();

    let node = tokio::spawn(async move {
        let frame = recv(&mut srv).await;
        let reply = json!({
            "type": "tool_result",
            "data": {"requestId": data(&frame)["requestId"], "status": "error", "error": "quota exceeded"}
        });
        send(&mut srv, reply).await;
        srv
    });

    let err = t
        .hub()
        .call(&server_id, "search", json!({}), Some(TIMEOUT))
        .await
        .unwrap_err();
    assert_matches!(err, HubError::Remote { ref message, .. } if message == "quota exceeded");
    let _srv = node.await.unwrap();
}

#[tokio::test]
async fn unanswered_call_times_out_and_late_result_is_ignored() {
    let t = boot().await;
    let mut srv = t.connect(Role::DistributedServer).await;
    send(&mut srv, json!({"type": "report_ip", "data": {"serverName": "srv1"}})).await;
    eventually("named", || {
        t.hub()
            .distributed_servers()
            .first()
            .is_some_and(|r| r.display_name() == "srv1")
    })
    .await;

    let started = tokio::time::Instant::now();
    let err = t
        .hub()
        .call("srv1", "search", json!({"q": "x"}), Some(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_matches!(err, HubError::Timeout { .. });
    let msg = err.to_string();
    assert!(msg.contains("search") && msg.contains("srv1"), "got: {msg}");
    assert_eq!(t.hub().pending_calls(), 0);

    let frame = recv(&mut srv).await;
    send(
        &mut srv,
        json!({"type": "tool_result", "data": {"requestId": data(&frame)["requestId"], "status": "success"}}),
    )
    .await;
    send(&mut srv, json!({"type": "register_tools", "data": {"tools": ["after"]}})).await;
    eventually("later frame processed", || t.hub().exposed_tools().contains("after")).await;
    assert_eq!(t.hub().pending_calls(), 0);
}

#[tokio::test]
async fn closing_a_server_removes_its_tools_and_fails_calls() {
    let t = boot().await;
    let mut srv = t.connect(Role::DistributedServer).await;
    let mut other = t.connect(Role::DistributedServer).await;
    send(&mut srv, json!({"type": "register_tools", "data": {"tools": ["search", "fetch"]}})).await;
    send(&mut other, json!({"type": "register_tools", "data": {"tools": ["fetch"]}})).await;
    eventually("both registered", || t.hub().exposed_tools().len() == 2).await;
    let server_id = t
        .hub()
        .distributed_servers()
        .into_iter()
        .find(|r| r.tools.len() == 2)
        .unwrap()
        .server_id;

    let hub = Arc::clone(t.hub());
    let id = server_id.to_string();
    let in_flight = tokio::spawn(async move { hub.call(&id, "search", json!({}), Some(TIMEOUT)).await });
    let _ = recv(&mut srv).await;

    srv.close(None).await.unwrap();
    let err = in_flight.await.unwrap().unwrap_err();
    assert_matches!(err, HubError::Disconnected { .. });

    eventually("record removed", || t.hub().distributed_servers().len() == 1).await;
    let exposed: Vec<String> = t.hub().exposed_tools().into_iter().collect();
    assert_eq!(exposed, vec!["fetch"]);
    assert!(t.runtime.tools_for(&server_id).is_empty());

    let err = t
        .hub()
        .call(&server_id, "search", json!({}), Some(TIMEOUT))
        .await
        .unwrap_err();
    assert!(err.is_routing());
}

// ── Broadcast ───────────────────────────────────────────────────────

#[tokio::test]
async fn broadcast_reaches_subscribers_and_servers_only() {
    let t = boot().await;
    let mut log = t.connect(Role::LogSubscriber).await;
    let mut srv = t.connect(Role::DistributedServer).await;
    let mut dash = t.connect(Role::Dashboard).await;
    let mut ctl = t.connect(Role::BridgeControl).await;
    let _ = recv(&mut log).await;
    eventually("registered", || t.hub().connection_count() == 4).await;

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let frame = Envelope::new("log_line", json!({"line": "indexed 12 files"}));
    assert_eq!(t.hub().broadcast(&frame, None, Some(&cancelled)), 0);
    assert_eq!(t.hub().broadcast(&frame, None, None), 2);

    for ws in [&mut log, &mut srv] {
        let got = recv(ws).await;
        assert_eq!(got.frame_type, "log_line");
        assert_eq!(data(&got)["line"], "indexed 12 files");
    }
    assert_silent(&mut dash, Duration::from_millis(100)).await;
    assert_silent(&mut ctl, Duration::from_millis(100)).await;

    assert_eq!(t.hub().notify_dashboards(&Envelope::bare("stats")), 1);
    assert_eq!(recv(&mut dash).await.frame_type, "stats");
}

// ── Browser bridge ──────────────────────────────────────────────────

#[tokio::test]
async fn command_without_observer_gets_error_result() {
    let t = boot().await;
    let mut ctl = t.connect(Role::BridgeControl).await;
    send(&mut ctl, json!({"type": "command", "data": {"requestId": "r1", "command": "click"}})).await;
    let got = recv(&mut ctl).await;
    assert_eq!(got.frame_type, "command_result");
    assert_eq!(data(&got)["requestId"], "r1");
    assert_eq!(data(&got)["status"], "error");
}

#[tokio::test]
async fn command_relay_and_single_page_push() {
    let t = boot().await;
    let mut obs = t.connect(Role::BridgeObserver).await;
    let mut ctl = t.connect(Role::BridgeControl).await;
    eventually("bridge registered", || t.hub().connection_count() == 2).await;
    eventually("observer announced", || t.pages.observers().len() == 1).await;

    send(
        &mut ctl,
        json!({"type": "command", "data": {"requestId": "r1", "command": "open_url", "url": "https://example.org", "wait_for_page_info": true}}),
    )
    .await;

    let cmd = recv(&mut obs).await;
    assert_eq!(cmd.frame_type, "command");
    assert_eq!(data(&cmd)["url"], "https://example.org");
    let source = data(&cmd)["sourceClientId"].as_str().unwrap().to_owned();
    assert_eq!(t.hub().waiting_bridge_clients(), 1);

    send(
        &mut obs,
        json!({"type": "command_result", "data": {"requestId": "r1", "sourceClientId": source, "status": "success"}}),
    )
    .await;
    let result = recv(&mut ctl).await;
    assert_eq!(result.frame_type, "command_result");
    assert_eq!(data(&result)["status"], "success");

    let update = json!({"type": "pageInfoUpdate", "data": {"markdown": "# Example Domain"}});
    send(&mut obs, update.clone()).await;
    send(&mut obs, update).await;

    let pushed = recv(&mut ctl).await;
    assert_eq!(pushed.frame_type, "page_info_update");
    assert_eq!(data(&pushed)["requestId"], "r1");
    assert_eq!(data(&pushed)["markdown"], "# Example Domain");
    assert_silent(&mut ctl, Duration::from_millis(150)).await;
    assert_eq!(t.hub().waiting_bridge_clients(), 0);

    eventually("page state tracked", || t.pages.latest().is_some()).await;
}

#[tokio::test]
async fn observer_heartbeat_and_malformed_frames() {
    let t = boot().await;
    let mut obs = t.connect(Role::BridgeObserver).await;
    obs.send(Message::text("{not json")).await.unwrap();
    obs.send(Message::binary(br#"{"type":"heartbeat"}"#.to_vec())).await.unwrap();

    let ack = recv(&mut obs).await;
    assert_eq!(ack.frame_type, "heartbeat_ack");
    assert!(data(&ack)["timestamp"].as_i64().unwrap() > 0);
    assert_eq!(t.hub().connection_count(), 1);
}

#[tokio::test]
async fn waiting_control_client_that_closes_is_forgotten() {
    let t = boot().await;
    let mut obs = t.connect(Role::BridgeObserver).await;
    let mut ctl = t.connect(Role::BridgeControl).await;
    send(
        &mut ctl,
        json!({"type": "command", "data": {"requestId": "r9", "command": "snapshot", "wait_for_page_info": true}}),
    )
    .await;
    let _ = recv(&mut obs).await;
    assert_eq!(t.hub().waiting_bridge_clients(), 1);

    ctl.close(None).await.unwrap();
    eventually("waiter cleared", || t.hub().waiting_bridge_clients() == 0).await;
    send(&mut obs, json!({"type": "pageInfoUpdate", "data": {"markdown": "x"}})).await;
    eventually("control removed", || t.hub().connection_count() == 1).await;
}

// ── Shutdown ────────────────────────────────────────────────────────

#[tokio::test]
async fn shutdown_closes_sessions_and_empties_registry() {
    let t = boot().await;
    let mut log = t.connect(Role::LogSubscriber).await;
    let _srv = t.connect(Role::DistributedServer).await;
    let _ = recv(&mut log).await;
    eventually("registered", || t.hub().connection_count() == 2).await;

    t.server.shutdown().shutdown();
    eventually("sessions ended", || t.hub().connection_count() == 0).await;
    assert!(t.hub().distributed_servers().is_empty());
}
