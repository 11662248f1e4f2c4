use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_core::{
    AxisTriplet, BaselinePolicy, Bus, LatchPolicy, MotionState, MotionVerdict, LOCK_ANGLE_CLOSED,
    TAMPER_ALERT,
};
use vigil_protocol::MonitorMessage;

use super::{pause, LoopExit};
use crate::hardware::{ActuatorPanel, SensorBus};
use crate::session::{OutputChannel, SessionError};

/// Accelerometer polling loop and tamper alarm.
///
/// Owns the [`MotionState`] outright: previous triplets and the alarm latch
/// are only ever touched from this loop.
pub struct MotionMonitor {
    sensors: Arc<dyn SensorBus>,
    actuators: Arc<dyn ActuatorPanel>,
    output: OutputChannel,
    state: MotionState,
    baseline: BaselinePolicy,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl MotionMonitor {
    pub fn new(
        sensors: Arc<dyn SensorBus>,
        actuators: Arc<dyn ActuatorPanel>,
        output: OutputChannel,
        baseline: BaselinePolicy,
        latch: LatchPolicy,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            sensors,
            actuators,
            output,
            state: MotionState::new(latch),
            baseline,
            interval,
            cancel_token,
        }
    }

    /// Returns the current motion state.
    pub fn state(&self) -> &MotionState {
        &self.state
    }

    /// Returns true once the tamper alarm has fired this session.
    pub fn alarm_triggered(&self) -> bool {
        self.state.alarm_triggered()
    }

    /// Runs until cancelled or until a write fails.
    pub async fn run(&mut self) -> Result<LoopExit, SessionError> {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            baseline = %self.baseline,
            "Motion monitor started"
        );

        if self.baseline == BaselinePolicy::FirstReading {
            let Some((a, b)) = self.cancel_token.run_until_cancelled(self.read_buses()).await
            else {
                return Ok(LoopExit::Cancelled);
            };
            self.state = MotionState::seeded(a, b, self.state.latch().policy());
            debug!(bus_a = %a, bus_b = %b, "Motion baseline seeded");

            if !pause(&self.cancel_token, self.interval).await {
                return Ok(LoopExit::Cancelled);
            }
        }

        loop {
            let Some((a, b)) = self.cancel_token.run_until_cancelled(self.read_buses()).await
            else {
                break;
            };

            if let Err(e) = self.evaluate(a, b).await {
                debug!(error = %e, "Motion monitor stopping on write failure");
                return Err(e);
            }

            if !pause(&self.cancel_token, self.interval).await {
                break;
            }
        }

        debug!("Motion monitor cancelled");
        Ok(LoopExit::Cancelled)
    }

    /// Runs one decision cycle over a fresh pair of readings.
    ///
    /// On the first crossing of the session this alerts, locks and sends the
    /// tamper line, in that order.
    pub async fn evaluate(
        &mut self,
        a: AxisTriplet,
        b: AxisTriplet,
    ) -> Result<MotionVerdict, SessionError> {
        debug!(bus_a = %a, bus_b = %b, "Accelerometer reading");

        let verdict = self.state.observe(a, b);
        match verdict {
            MotionVerdict::Quiet => {}
            MotionVerdict::Tamper { bus, axis, delta } => {
                warn!(%bus, %axis, delta, "Tamper detected");
                self.actuators.alert(TAMPER_ALERT).await;
                self.actuators.lock(LOCK_ANGLE_CLOSED).await;
                self.output
                    .send(&MonitorMessage::tamper_detected())
                    .await?;
                info!("Tamper alert sent");
            }
            MotionVerdict::Suppressed { bus, axis, delta } => {
                debug!(%bus, %axis, delta, "Motion above threshold while alarm latched");
            }
        }

        Ok(verdict)
    }

    async fn read_buses(&self) -> (AxisTriplet, AxisTriplet) {
        let a = self.sensors.read_axis_triplet(Bus::A).await;
        let b = self.sensors.read_axis_triplet(Bus::B).await;
        (a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{ScriptedSensorBus, SteadySensorBus};
    use async_trait::async_trait;
    use tokio::io::{AsyncReadExt, DuplexStream};
    use tokio::sync::Mutex;
    use vigil_core::{AlertPattern, Axis, THRESHOLD};

    const T: i32 = THRESHOLD as i32;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Alert(AlertPattern),
        Lock(u16),
    }

    #[derive(Default)]
    struct RecordingPanel {
        calls: Mutex<Vec<Call>>,
    }

    #[async_trait]
    impl ActuatorPanel for RecordingPanel {
        async fn alert(&self, pattern: AlertPattern) {
            self.calls.lock().await.push(Call::Alert(pattern));
        }

        async fn lock(&self, angle: u16) {
            self.calls.lock().await.push(Call::Lock(angle));
        }
    }

    struct Harness {
        monitor: MotionMonitor,
        panel: Arc<RecordingPanel>,
        client: DuplexStream,
        token: CancellationToken,
    }

    fn harness(sensors: Arc<dyn SensorBus>, baseline: BaselinePolicy) -> Harness {
        let (client, server) = tokio::io::duplex(4096);
        let panel = Arc::new(RecordingPanel::default());
        let token = CancellationToken::new();
        let monitor = MotionMonitor::new(
            sensors,
            panel.clone(),
            OutputChannel::new(server, Duration::from_secs(1)),
            baseline,
            LatchPolicy::OneShot,
            Duration::from_millis(500),
            token.clone(),
        );
        Harness {
            monitor,
            panel,
            client,
            token,
        }
    }

    #[tokio::test]
    async fn test_first_crossing_alerts_locks_and_notifies() {
        let mut h = harness(Arc::new(SteadySensorBus::default()), BaselinePolicy::Zero);

        let verdict = h
            .monitor
            .evaluate(AxisTriplet::new(T, 0, 0), AxisTriplet::ZERO)
            .await
            .unwrap();
        assert_eq!(
            verdict,
            MotionVerdict::Tamper {
                bus: Bus::A,
                axis: Axis::X,
                delta: THRESHOLD
            }
        );
        assert!(h.monitor.alarm_triggered());
        assert_eq!(
            *h.panel.calls.lock().await,
            vec![Call::Alert(TAMPER_ALERT), Call::Lock(LOCK_ANGLE_CLOSED)]
        );

        let mut buf = vec![0u8; 64];
        let n = h.client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], "도난 감지됨!\n".as_bytes());
    }

    #[tokio::test]
    async fn test_later_crossings_are_silent() {
        let mut h = harness(Arc::new(SteadySensorBus::default()), BaselinePolicy::Zero);

        h.monitor
            .evaluate(AxisTriplet::new(T, 0, 0), AxisTriplet::ZERO)
            .await
            .unwrap();
        for i in 1..=5 {
            let verdict = h
                .monitor
                .evaluate(AxisTriplet::new(T * (i % 2), 0, 0), AxisTriplet::new(0, 0, T * i))
                .await
                .unwrap();
            assert!(!verdict.is_tamper());
        }

        assert_eq!(h.panel.calls.lock().await.len(), 2);
        assert_eq!(h.monitor.output.lines_sent(), 1);
    }

    #[tokio::test]
    async fn test_below_threshold_is_quiet() {
        let mut h = harness(Arc::new(SteadySensorBus::default()), BaselinePolicy::Zero);

        let verdict = h
            .monitor
            .evaluate(AxisTriplet::new(T - 1, 1 - T, T - 1), AxisTriplet::new(T - 1, 0, 0))
            .await
            .unwrap();
        assert_eq!(verdict, MotionVerdict::Quiet);
        assert!(h.panel.calls.lock().await.is_empty());
        assert_eq!(h.monitor.output.lines_sent(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_baseline_trips_on_resting_gravity() {
        // A resting accelerometer reads ~1 g on z (raw 25600 -> 256 scaled).
        let resting = AxisTriplet::new(0, 0, 256);
        let sensors = Arc::new(SteadySensorBus::new(Default::default(), resting, resting));
        let h = harness(sensors, BaselinePolicy::Zero);

        let token = h.token.clone();
        let mut monitor = h.monitor;
        let handle = tokio::spawn(async move {
            let exit = monitor.run().await;
            (monitor, exit)
        });

        tokio::time::sleep(Duration::from_secs(2)).await;
        token.cancel();
        let (monitor, exit) = handle.await.unwrap();

        assert_eq!(exit.unwrap(), LoopExit::Cancelled);
        assert!(monitor.alarm_triggered());
        assert_eq!(h.panel.calls.lock().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_reading_baseline_ignores_resting_gravity() {
        let resting = AxisTriplet::new(0, 0, 256);
        let sensors = Arc::new(SteadySensorBus::new(Default::default(), resting, resting));
        let h = harness(sensors, BaselinePolicy::FirstReading);

        let token = h.token.clone();
        let mut monitor = h.monitor;
        let handle = tokio::spawn(async move {
            let exit = monitor.run().await;
            (monitor, exit)
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        token.cancel();
        let (monitor, exit) = handle.await.unwrap();

        assert_eq!(exit.unwrap(), LoopExit::Cancelled);
        assert!(!monitor.alarm_triggered());
        assert_eq!(monitor.state().previous(Bus::A), resting);
        assert!(h.panel.calls.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_detects_scripted_bump_on_bus_b() {
        let still = AxisTriplet::new(0, 0, 256);
        let bumped = AxisTriplet::new(0, 0, 256 + T);
        let sensors = Arc::new(ScriptedSensorBus::from_readings(
            vec![],
            vec![still],
            vec![still, still, still, bumped],
        ));
        let h = harness(sensors, BaselinePolicy::FirstReading);

        let token = h.token.clone();
        let mut monitor = h.monitor;
        let handle = tokio::spawn(async move {
            let exit = monitor.run().await;
            (monitor, exit)
        });

        // Seed at t=0, compares at 0.5, 1.0, 1.5 (bump), 2.0 ...
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(h.panel.calls.lock().await.is_empty());
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(h.panel.calls.lock().await.len(), 2);

        token.cancel();
        let (monitor, _) = handle.await.unwrap();
        assert!(monitor.alarm_triggered());
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let mut h = harness(Arc::new(SteadySensorBus::default()), BaselinePolicy::FirstReading);
        h.token.cancel();
        assert_eq!(h.monitor.run().await.unwrap(), LoopExit::Cancelled);
        assert!(!h.monitor.alarm_triggered());
    }
}
