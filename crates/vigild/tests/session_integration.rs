//! Integration tests for a full monitoring session over TCP.
//!
//! These tests bind a real `MonitorServer` on an ephemeral port, connect a
//! client, and check what arrives on the wire, what the actuators were told
//! to do, and how the session ends.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use vigil_core::{AlertPattern, AxisTriplet, BaselinePolicy, ClimateReading, THRESHOLD};
use vigil_protocol::MonitorMessage;
use vigild::hardware::{ActuatorPanel, ScriptedSensorBus, SensorBus};
use vigild::{EndReason, MonitorConfig, MonitorServer, ServerError, SessionSummary};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for any single wait in these tests
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum ActuatorCall {
    Alert(AlertPattern),
    Lock(u16),
}

/// Actuator panel that remembers every command.
#[derive(Default)]
struct RecordingPanel {
    calls: Mutex<Vec<ActuatorCall>>,
}

#[async_trait]
impl ActuatorPanel for RecordingPanel {
    async fn alert(&self, pattern: AlertPattern) {
        self.calls.lock().await.push(ActuatorCall::Alert(pattern));
    }

    async fn lock(&self, angle: u16) {
        self.calls.lock().await.push(ActuatorCall::Lock(angle));
    }
}

/// A running server plus handles the tests need.
struct TestServer {
    addr: SocketAddr,
    panel: Arc<RecordingPanel>,
    cancel_token: CancellationToken,
    handle: JoinHandle<Result<SessionSummary, ServerError>>,
}

impl TestServer {
    /// Spawns a server with fast poll intervals.
    async fn spawn(sensors: Arc<dyn SensorBus>) -> Self {
        let panel = Arc::new(RecordingPanel::default());
        let cancel_token = CancellationToken::new();
        let config = MonitorConfig {
            climate_interval: Duration::from_millis(50),
            motion_interval: Duration::from_millis(10),
            baseline: BaselinePolicy::FirstReading,
            ..Default::default()
        };

        let server = MonitorServer::bind(
            "127.0.0.1:0",
            sensors,
            panel.clone(),
            config,
            cancel_token.clone(),
        )
        .await
        .expect("bind server");
        let addr = server.local_addr().expect("local addr");

        let handle = tokio::spawn(server.run());

        TestServer {
            addr,
            panel,
            cancel_token,
            handle,
        }
    }

    async fn connect(&self) -> TestClient {
        let stream = TcpStream::connect(self.addr).await.expect("connect");
        TestClient::new(stream)
    }

    async fn finish(self) -> Result<SessionSummary, ServerError> {
        timeout(STEP_TIMEOUT, self.handle)
            .await
            .expect("server finished in time")
            .expect("server task joined")
    }
}

struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Reads one line; `None` on EOF.
    async fn recv_line(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = timeout(STEP_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("line arrived in time")
            .expect("read line");
        (n > 0).then_some(line)
    }

    /// Reads lines until `pred` matches one, returning everything read.
    async fn recv_until(&mut self, pred: impl Fn(&str) -> bool) -> Vec<String> {
        let mut seen = Vec::new();
        while let Some(line) = self.recv_line().await {
            let done = pred(&line);
            seen.push(line);
            if done {
                return seen;
            }
        }
        panic!("connection closed before expected line; saw {seen:?}");
    }

    async fn send(&mut self, text: &str) {
        self.writer.write_all(text.as_bytes()).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Half-closes the connection; the daemon sees EOF.
    async fn close_write(&mut self) {
        self.writer.shutdown().await.unwrap();
    }

    /// Hangs up cleanly and drains whatever the daemon still sends.
    async fn hang_up(mut self) -> Vec<String> {
        self.close_write().await;
        let mut rest = Vec::new();
        while let Some(line) = self.recv_line().await {
            rest.push(line);
        }
        rest
    }
}

fn still() -> AxisTriplet {
    AxisTriplet::new(0, 0, 256)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_status_line_arrives_and_disconnect_ends_session() {
    let sensors = Arc::new(ScriptedSensorBus::from_readings(
        vec![ClimateReading::new(25, 35)],
        vec![still()],
        vec![still()],
    ));
    let server = TestServer::spawn(sensors).await;
    let mut client = server.connect().await;

    let line = client.recv_line().await.unwrap();
    assert_eq!(line, "현재 온도: 25°C, 현재 습도: 35%\n");

    client.send("ping\n").await;
    client.hang_up().await;

    let summary = server.finish().await.unwrap();
    assert_eq!(summary.end_reason, EndReason::ClientDisconnected);
    assert!(!summary.alarm_triggered);
    assert!(summary.lines_sent >= 1);
}

#[tokio::test]
async fn test_out_of_range_reading_sends_warning() {
    let sensors = Arc::new(ScriptedSensorBus::from_readings(
        vec![ClimateReading::new(31, 35)],
        vec![still()],
        vec![still()],
    ));
    let server = TestServer::spawn(sensors).await;
    let mut client = server.connect().await;

    assert_eq!(
        client.recv_line().await.unwrap(),
        "현재 온도: 31°C, 현재 습도: 35%\n"
    );
    assert_eq!(
        client.recv_line().await.unwrap(),
        "온습도 경고: 온도=31°C, 습도=35%\n"
    );

    client.hang_up().await;
    server.finish().await.unwrap();
}

#[tokio::test]
async fn test_tamper_alert_is_sent_once() {
    let bump = AxisTriplet::new(0, 0, 256 + THRESHOLD as i32);
    // Every reading after the baseline alternates, so every cycle crosses.
    let mut bus_a = vec![still()];
    for _ in 0..20 {
        bus_a.push(bump);
        bus_a.push(still());
    }
    let sensors = Arc::new(ScriptedSensorBus::from_readings(
        vec![ClimateReading::new(25, 35)],
        bus_a,
        vec![still()],
    ));
    let server = TestServer::spawn(sensors).await;
    let mut client = server.connect().await;

    client.recv_until(|line| line == "도난 감지됨!\n").await;

    // Let the remaining crossings play out; no further alert may appear.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let rest = client.hang_up().await;
    assert!(
        rest.iter().all(|line| line != "도난 감지됨!\n"),
        "tamper alert repeated: {rest:?}"
    );
    for line in &rest {
        line.parse::<MonitorMessage>().expect("well-formed line");
    }

    let summary = server.finish().await.unwrap();
    assert!(summary.alarm_triggered);
    assert_eq!(summary.end_reason, EndReason::ClientDisconnected);
}

#[tokio::test]
async fn test_actuators_driven_once_on_tamper() {
    let bump = AxisTriplet::new(THRESHOLD as i32, 0, 256);
    let sensors = Arc::new(ScriptedSensorBus::from_readings(
        vec![],
        vec![still(), still(), bump, still(), bump],
        vec![still()],
    ));
    let server = TestServer::spawn(sensors).await;
    let mut client = server.connect().await;

    client.recv_until(|line| line == "도난 감지됨!\n").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let calls = server.panel.calls.lock().await.clone();
    assert_eq!(
        calls,
        vec![
            ActuatorCall::Alert(vigil_core::TAMPER_ALERT),
            ActuatorCall::Lock(vigil_core::LOCK_ANGLE_CLOSED),
        ]
    );

    client.hang_up().await;
    server.finish().await.unwrap();
}

#[tokio::test]
async fn test_second_client_is_refused() {
    let sensors = Arc::new(ScriptedSensorBus::from_readings(vec![], vec![], vec![]));
    let server = TestServer::spawn(sensors).await;
    let mut first = server.connect().await;
    first.recv_line().await.unwrap();

    // The listening socket is closed once the first client is accepted.
    assert!(TcpStream::connect(server.addr).await.is_err());

    first.hang_up().await;
    server.finish().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_before_client_connects() {
    let sensors = Arc::new(ScriptedSensorBus::from_readings(vec![], vec![], vec![]));
    let server = TestServer::spawn(sensors).await;

    server.cancel_token.cancel();
    let result = server.finish().await;
    assert!(matches!(result, Err(ServerError::Cancelled)));
}

#[tokio::test]
async fn test_shutdown_during_session_closes_connection() {
    let sensors = Arc::new(ScriptedSensorBus::from_readings(vec![], vec![], vec![]));
    let server = TestServer::spawn(sensors).await;
    let mut client = server.connect().await;
    client.recv_line().await.unwrap();

    server.cancel_token.cancel();

    // Drain until EOF: the daemon shuts down its write half.
    while client.recv_line().await.is_some() {}

    let summary = server.finish().await.unwrap();
    assert_eq!(summary.end_reason, EndReason::ShutdownRequested);
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let sensors: Arc<dyn SensorBus> =
        Arc::new(ScriptedSensorBus::from_readings(vec![], vec![], vec![]));
    let panel = Arc::new(RecordingPanel::default());
    let first = MonitorServer::bind(
        "127.0.0.1:0",
        sensors.clone(),
        panel.clone(),
        MonitorConfig::default(),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    let addr = first.local_addr().unwrap().to_string();

    let err = MonitorServer::bind(
        &addr,
        sensors,
        panel,
        MonitorConfig::default(),
        CancellationToken::new(),
    )
    .await
    .err()
    .expect("second bind must fail");
    assert!(matches!(err, ServerError::Bind { .. }));
}
