use crate::driver::{Connector, ScanSource};
use crate::osc::{MessageSink, OscClient, OutboundMessage};
use crate::signal::Shutdown;
use crate::{LidarError, Result};

/// Why the scanning phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A scan could not be read or forwarded.
    ScanError,
    /// The shutdown token was triggered.
    Interrupted,
    /// `running` was cleared without an error or interrupt.
    Finished,
}

/// Pulls scans from the rangefinder and forwards every measurement.
///
/// Owns the message sink for its whole lifetime and the driver session
/// only while scanning; at most one session is open at a time.
pub struct LidarController<S: MessageSink, C: Connector> {
    com_port: String,
    sink: S,
    connector: C,
    source: Option<C::Source>,
    running: bool,
    shutdown: Shutdown,
}

impl<C: Connector> LidarController<OscClient, C> {
    /// Build a controller that publishes to `host:port` over OSC.
    ///
    /// The OSC client is created here, so an unusable destination fails
    /// before any serial I/O happens.
    pub fn new(
        com_port: &str,
        host: &str,
        port: u16,
        connector: C,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let sink = OscClient::new(host, port)?;
        Ok(Self::with_sink(com_port, sink, connector, shutdown))
    }
}

impl<S: MessageSink, C: Connector> LidarController<S, C> {
    /// Build a controller around an already constructed sink.
    pub fn with_sink(com_port: &str, sink: S, connector: C, shutdown: Shutdown) -> Self {
        Self {
            com_port: com_port.to_string(),
            sink,
            connector,
            source: None,
            running: false,
            shutdown,
        }
    }

    /// True while the scan loop is active.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True while a driver session is held.
    pub fn has_session(&self) -> bool {
        self.source.is_some()
    }

    /// Connect to the rangefinder and forward scans until an error or interrupt.
    ///
    /// Returns `Err` only when the session could not be opened; in that case
    /// no scan is read. An interrupt during the handshake is not an error.
    /// Every exit path releases the session through [`stop`].
    ///
    /// [`stop`]: LidarController::stop
    pub fn start(&mut self) -> Result<StopReason> {
        log::info!("Connecting to LIDAR on {}...", self.com_port);
        match self.connector.connect(&self.com_port) {
            Ok(source) => self.source = Some(source),
            Err(e) if matches!(e, LidarError::Interrupted) || self.shutdown.is_triggered() => {
                log::debug!("Handshake interrupted: {}", e);
                self.stop();
                return Ok(StopReason::Interrupted);
            }
            Err(e) => {
                log::error!("Error starting scan: {}", e);
                self.stop();
                return Err(e);
            }
        }
        self.running = true;

        log::info!("Starting LIDAR scan...");
        let reason = self.scan_loop();
        self.stop();
        Ok(reason)
    }

    fn scan_loop(&mut self) -> StopReason {
        while self.running {
            if self.shutdown.is_triggered() {
                return StopReason::Interrupted;
            }
            if let Err(e) = self.forward_next_scan() {
                if matches!(e, LidarError::Interrupted) || self.shutdown.is_triggered() {
                    return StopReason::Interrupted;
                }
                log::error!("Error during scan: {}", e);
                return StopReason::ScanError;
            }
        }
        StopReason::Finished
    }

    fn forward_next_scan(&mut self) -> Result<()> {
        let source = self.source.as_mut().ok_or(LidarError::NotConnected)?;
        let scan = source.next_scan()?;
        log::trace!("Forwarding {} measurements", scan.len());
        for m in &scan {
            self.sink.send(&OutboundMessage::from_measurement(m))?;
        }
        Ok(())
    }

    /// Stop scanning and release the session. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.running = false;
        if let Some(mut source) = self.source.take() {
            log::info!("Stopping LIDAR...");
            if let Err(e) = source.stop() {
                log::warn!("Failed to stop scan: {}", e);
            }
            if let Err(e) = source.disconnect() {
                log::warn!("Failed to disconnect: {}", e);
            }
        }
        log::info!("LIDAR stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RpLidar;
    use crate::driver::handshake;
    use crate::transport::mock::MockTransport;
    use crate::types::{Measurement, Scan};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Calls {
        connects: usize,
        pulls: usize,
        stops: usize,
        disconnects: usize,
    }

    enum Step {
        Scan(Scan),
        Fail,
        /// Trigger shutdown while "blocked", then report the interrupted read.
        Interrupt,
    }

    struct FakeSource {
        steps: VecDeque<Step>,
        calls: Rc<RefCell<Calls>>,
        shutdown: Shutdown,
    }

    impl ScanSource for FakeSource {
        fn next_scan(&mut self) -> Result<Scan> {
            self.calls.borrow_mut().pulls += 1;
            match self.steps.pop_front() {
                Some(Step::Scan(scan)) => Ok(scan),
                Some(Step::Fail) => Err(LidarError::ScanFlagMismatch),
                Some(Step::Interrupt) => {
                    self.shutdown.trigger();
                    Err(LidarError::Interrupted)
                }
                None => Err(LidarError::NotConnected),
            }
        }

        fn stop(&mut self) -> Result<()> {
            self.calls.borrow_mut().stops += 1;
            Ok(())
        }

        fn disconnect(&mut self) -> Result<()> {
            self.calls.borrow_mut().disconnects += 1;
            Ok(())
        }
    }

    struct FakeConnector {
        steps: Option<Vec<Step>>,
        /// Fail `connect` with this error instead of opening a session.
        refuse: Option<fn() -> LidarError>,
        calls: Rc<RefCell<Calls>>,
        shutdown: Shutdown,
    }

    impl FakeConnector {
        fn new(steps: Vec<Step>, shutdown: &Shutdown) -> Self {
            Self {
                steps: Some(steps),
                refuse: None,
                calls: Rc::default(),
                shutdown: shutdown.clone(),
            }
        }

        fn failing(shutdown: &Shutdown) -> Self {
            Self::refusing(|| LidarError::NotConnected, shutdown)
        }

        fn refusing(err: fn() -> LidarError, shutdown: &Shutdown) -> Self {
            Self {
                steps: None,
                refuse: Some(err),
                calls: Rc::default(),
                shutdown: shutdown.clone(),
            }
        }
    }

    impl Connector for FakeConnector {
        type Source = FakeSource;

        fn connect(&mut self, _port: &str) -> Result<FakeSource> {
            self.calls.borrow_mut().connects += 1;
            if let Some(err) = self.refuse {
                return Err(err());
            }
            let steps = self.steps.take().ok_or(LidarError::NotConnected)?;
            Ok(FakeSource {
                steps: steps.into(),
                calls: self.calls.clone(),
                shutdown: self.shutdown.clone(),
            })
        }
    }

    /// Runs the real handshake against a scripted serial link.
    struct MockConnector {
        transport: Option<MockTransport>,
        shutdown: Shutdown,
    }

    impl Connector for MockConnector {
        type Source = RpLidar<MockTransport>;

        fn connect(&mut self, _port: &str) -> Result<Self::Source> {
            let t = self.transport.take().ok_or(LidarError::NotConnected)?;
            handshake(RpLidar::with_transport(t, self.shutdown.clone()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<OutboundMessage>,
    }

    impl MessageSink for RecordingSink {
        fn send(&mut self, msg: &OutboundMessage) -> Result<()> {
            self.sent.push(*msg);
            Ok(())
        }
    }

    fn controller(
        connector: FakeConnector,
        shutdown: Shutdown,
    ) -> LidarController<RecordingSink, FakeConnector> {
        LidarController::with_sink("COM5", RecordingSink::default(), connector, shutdown)
    }

    fn scan(points: &[(u8, f64, f64)]) -> Step {
        Step::Scan(
            points
                .iter()
                .map(|&(q, a, d)| Measurement::new(q, a, d))
                .collect(),
        )
    }

    #[test]
    fn test_forwards_each_measurement_in_order() {
        let shutdown = Shutdown::new();
        let connector = FakeConnector::new(
            vec![scan(&[(15, 10.0, 500.0), (12, 11.5, 505.0)]), Step::Fail],
            &shutdown,
        );
        let mut ctl = controller(connector, shutdown);
        assert_eq!(ctl.start().unwrap(), StopReason::ScanError);

        let sent = &ctl.sink.sent;
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            OutboundMessage {
                new_scan: true,
                quality: 15,
                angle: 10.0,
                distance: 500.0
            }
        );
        assert_eq!(
            sent[1],
            OutboundMessage {
                new_scan: true,
                quality: 12,
                angle: 11.5,
                distance: 505.0
            }
        );
    }

    #[test]
    fn test_error_on_third_pull_stops_after_two_scans() {
        let shutdown = Shutdown::new();
        let connector = FakeConnector::new(
            vec![
                scan(&[(10, 1.0, 100.0), (10, 2.0, 200.0)]),
                scan(&[(11, 3.0, 300.0)]),
                Step::Fail,
                scan(&[(12, 4.0, 400.0)]),
            ],
            &shutdown,
        );
        let calls = connector.calls.clone();
        let mut ctl = controller(connector, shutdown);
        assert_eq!(ctl.start().unwrap(), StopReason::ScanError);

        let angles: Vec<f32> = ctl.sink.sent.iter().map(|m| m.angle).collect();
        assert_eq!(angles, vec![1.0, 2.0, 3.0]);
        assert!(ctl.sink.sent.iter().all(|m| m.new_scan));
        assert!(!ctl.is_running());
        assert!(!ctl.has_session());

        let calls = calls.borrow();
        assert_eq!(calls.pulls, 3);
        assert_eq!(calls.disconnects, 1);
    }

    #[test]
    fn test_connect_failure_runs_stop_and_never_pulls() {
        let shutdown = Shutdown::new();
        let connector = FakeConnector::failing(&shutdown);
        let calls = connector.calls.clone();
        let mut ctl = controller(connector, shutdown);

        assert!(ctl.start().is_err());
        assert!(!ctl.is_running());
        assert!(ctl.sink.sent.is_empty());
        let calls = calls.borrow();
        assert_eq!(calls.connects, 1);
        assert_eq!(calls.pulls, 0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let shutdown = Shutdown::new();
        let mut ctl = controller(FakeConnector::new(Vec::new(), &shutdown), shutdown);
        ctl.stop();
        ctl.stop();
        assert!(!ctl.is_running());
        assert!(!ctl.has_session());
        assert_eq!(ctl.connector.calls.borrow().disconnects, 0);
    }

    #[test]
    fn test_interrupt_during_pull_disconnects_once() {
        let shutdown = Shutdown::new();
        let connector = FakeConnector::new(
            vec![scan(&[(15, 10.0, 500.0)]), Step::Interrupt, scan(&[(1, 1.0, 1.0)])],
            &shutdown,
        );
        let calls = connector.calls.clone();
        let mut ctl = controller(connector, shutdown);

        assert_eq!(ctl.start().unwrap(), StopReason::Interrupted);
        ctl.stop();

        assert_eq!(ctl.sink.sent.len(), 1);
        let calls = calls.borrow();
        assert_eq!(calls.stops, 1);
        assert_eq!(calls.disconnects, 1);
    }

    #[test]
    fn test_interrupt_before_first_pull() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let connector = FakeConnector::new(vec![scan(&[(15, 10.0, 500.0)])], &shutdown);
        let calls = connector.calls.clone();
        let mut ctl = controller(connector, shutdown);

        assert_eq!(ctl.start().unwrap(), StopReason::Interrupted);
        assert!(ctl.sink.sent.is_empty());
        assert_eq!(calls.borrow().pulls, 0);
        assert_eq!(calls.borrow().disconnects, 1);
    }

    #[test]
    fn test_invalid_destination_fails_before_serial_io() {
        let shutdown = Shutdown::new();
        let connector = FakeConnector::new(Vec::new(), &shutdown);
        let calls = connector.calls.clone();
        let result = LidarController::new("COM5", "", 8000, connector, shutdown);
        assert!(matches!(result, Err(LidarError::InvalidHost(_))));
        assert_eq!(calls.borrow().connects, 0);
    }

    #[test]
    fn test_interrupted_connect_is_not_an_error() {
        let shutdown = Shutdown::new();
        let connector = FakeConnector::refusing(|| LidarError::Interrupted, &shutdown);
        let calls = connector.calls.clone();
        let mut ctl = controller(connector, shutdown);

        assert_eq!(ctl.start().unwrap(), StopReason::Interrupted);
        assert!(!ctl.is_running());
        assert!(!ctl.has_session());
        assert!(ctl.sink.sent.is_empty());
        assert_eq!(calls.borrow().pulls, 0);
    }

    #[test]
    fn test_signal_during_handshake_read_exits_cleanly() {
        // Device stays silent; the signal lands while GET_INFO waits and the
        // serial read fails with EINTR.
        let shutdown = Shutdown::new();
        let mut t = MockTransport::new();
        t.eintr = 1;
        t.signal = Some(shutdown.clone());
        let connector = MockConnector {
            transport: Some(t),
            shutdown: shutdown.clone(),
        };
        let mut ctl =
            LidarController::with_sink("COM5", RecordingSink::default(), connector, shutdown);

        assert_eq!(ctl.start().unwrap(), StopReason::Interrupted);
        assert!(!ctl.is_running());
        assert!(!ctl.has_session());
        assert!(ctl.sink.sent.is_empty());
    }
}
