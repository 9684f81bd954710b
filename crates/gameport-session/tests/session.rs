use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use gameport_core::{Axis, AxisPolicy, ButtonId, RejectReason, AXIS_CENTER};
use gameport_session::{
    Connector, ConnectionSession, DeviceSink, EventReceiver, FailureKind, LogEvent,
    SessionConfig, SessionError, SessionEvent, SessionState, SinkError, SinkProvider,
    Transport, TransportError,
};

const TIMEOUT: Duration = Duration::from_secs(5);

// -------- live handle tracking

/// Counts itself in `count` until dropped.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count.clone())
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// -------- scripted transport

enum Step {
    Line(&'static str),
    Fail,
}

struct ChannelTransport {
    rx: Receiver<Step>,
    _live: LiveGuard,
}

impl Transport for ChannelTransport {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.rx.recv_timeout(Duration::from_millis(5)) {
            Ok(Step::Line(line)) => Ok(Some(format!("{line}\r\n").into_bytes())),
            Ok(Step::Fail) => Err(TransportError::Read(io::Error::other("unplugged"))),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

/// Hands out one scripted attempt per `open`; refuses once the script runs out.
#[derive(Clone, Default)]
struct ScriptedConnector {
    attempts: Arc<Mutex<VecDeque<Option<Receiver<Step>>>>>,
    opens: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    fn accept(&self) -> Sender<Step> {
        let (tx, rx) = unbounded();
        self.attempts.lock().unwrap().push_back(Some(rx));
        tx
    }

    fn refuse(&self) {
        self.attempts.lock().unwrap().push_back(None);
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Transports opened and not yet dropped.
    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    fn open(
        &self,
        port: &str,
        _config: &SessionConfig,
    ) -> Result<Box<dyn Transport>, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.attempts.lock().unwrap().pop_front().flatten() {
            Some(rx) => Ok(Box::new(ChannelTransport {
                rx,
                _live: LiveGuard::new(&self.live),
            })),
            None => Err(TransportError::Open {
                port: port.to_owned(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such port"),
            }),
        }
    }
}

// -------- recording sink

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Axis(Axis, u16),
    Button(ButtonId, bool),
}

#[derive(Clone, Default)]
struct RecordingProvider {
    calls: Arc<Mutex<Vec<Call>>>,
    refuse: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
    acquired: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl RecordingProvider {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Sinks acquired and not yet dropped.
    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn wait_for_calls(&self, count: usize) -> Vec<Call> {
        let deadline = Instant::now() + TIMEOUT;
        while Instant::now() < deadline {
            let calls = self.calls();
            if calls.len() >= count {
                return calls;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("expected {count} sink calls, got {:?}", self.calls());
    }
}

struct RecordingSink {
    provider: RecordingProvider,
    _live: LiveGuard,
}

impl RecordingSink {
    fn record(&self, call: Call) -> Result<(), SinkError> {
        if self.provider.fail_writes.load(Ordering::SeqCst) {
            return Err(SinkError::Write(io::Error::other("device rejected update")));
        }
        self.provider.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl DeviceSink for RecordingSink {
    fn set_axis(&mut self, axis: Axis, value: u16) -> Result<(), SinkError> {
        self.record(Call::Axis(axis, value))
    }

    fn set_button(&mut self, button: ButtonId, pressed: bool) -> Result<(), SinkError> {
        self.record(Call::Button(button, pressed))
    }
}

impl SinkProvider for RecordingProvider {
    fn acquire(&self, device_id: u32) -> Result<Box<dyn DeviceSink>, SinkError> {
        let refuse = self.refuse.load(Ordering::SeqCst);
        if refuse > 0 {
            self.refuse.store(refuse - 1, Ordering::SeqCst);
            return Err(SinkError::Acquire {
                device_id,
                source: io::Error::other("driver missing"),
            });
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingSink {
            provider: self.clone(),
            _live: LiveGuard::new(&self.live),
        }))
    }
}

// -------- helpers

fn fast_config() -> SessionConfig {
    SessionConfig::default()
        .with_settle_delay(Duration::ZERO)
        .with_retry_delay(Duration::from_millis(20))
        .with_read_timeout(Duration::from_millis(5))
}

fn session(
    connector: &ScriptedConnector,
    provider: &RecordingProvider,
    config: SessionConfig,
) -> (ConnectionSession, EventReceiver) {
    let session = ConnectionSession::new(connector.clone(), provider.clone(), config);
    let events = session.subscribe();
    (session, events)
}

/// Consume events until one matches, returning everything seen.
fn wait_for(
    events: &EventReceiver,
    mut pred: impl FnMut(&SessionEvent) -> bool,
) -> Vec<SessionEvent> {
    let deadline = Instant::now() + TIMEOUT;
    let mut seen = Vec::new();
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(left) {
            Ok(event) => {
                let done = pred(&event);
                seen.push(event);
                if done {
                    return seen;
                }
            }
            Err(_) => panic!("event not observed, seen: {seen:#?}"),
        }
    }
}

fn wait_for_state(events: &EventReceiver, state: &SessionState) -> Vec<SessionEvent> {
    wait_for(events, |e| matches!(e, SessionEvent::StateChanged(s) if s == state))
}

fn wait_for_failure(events: &EventReceiver, kind: FailureKind) -> Vec<SessionEvent> {
    wait_for(events, |e| {
        matches!(e, SessionEvent::StateChanged(SessionState::Failed(f)) if f.kind == kind)
    })
}

fn states(events: &[SessionEvent]) -> Vec<SessionState> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StateChanged(s) => Some(s.clone()),
            SessionEvent::Log(_) => None,
        })
        .collect()
}

fn frame_calls(x: u16, y: u16, z: u16, rx: u16, buttons: [bool; 4]) -> Vec<Call> {
    let mut calls = vec![
        Call::Axis(Axis::X, x),
        Call::Axis(Axis::Y, y),
        Call::Axis(Axis::Z, z),
        Call::Axis(Axis::RX, rx),
    ];
    for (i, pressed) in buttons.into_iter().enumerate() {
        calls.push(Call::Button(i as ButtonId + 1, pressed));
    }
    calls
}

// -------- scenarios

#[test]
fn happy_path_forwards_frame_and_stops_to_idle() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    let line_tx = connector.accept();
    let (session, events) = session(&connector, &provider, fast_config());

    session.start("/dev/ttyTEST").unwrap();
    let seen = wait_for_state(&events, &SessionState::Connected);
    assert_eq!(
        states(&seen),
        vec![SessionState::Connecting, SessionState::Connected]
    );
    assert!(seen.contains(&SessionEvent::Log(LogEvent::Connecting {
        port: "/dev/ttyTEST".into()
    })));

    line_tx.send(Step::Line("512,512,0,1023,0,1,0,1")).unwrap();
    let calls = provider.wait_for_calls(8);
    assert_eq!(
        calls,
        frame_calls(16400, 16400, 0, 32767, [false, true, false, true])
    );

    session.stop();
    let seen = wait_for_state(&events, &SessionState::Idle);
    assert_eq!(
        states(&seen),
        vec![SessionState::Disconnecting, SessionState::Idle]
    );
    assert!(seen.contains(&SessionEvent::Log(LogEvent::Disconnected)));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(!session.is_running());
    assert_eq!(connector.live(), 0);
    assert_eq!(provider.live(), 0);
}

#[test]
fn malformed_line_is_skipped_without_sink_calls() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    let line_tx = connector.accept();
    let (session, events) = session(&connector, &provider, fast_config());

    session.start("/dev/ttyTEST").unwrap();
    wait_for_state(&events, &SessionState::Connected);

    line_tx.send(Step::Line("1,2,3")).unwrap();
    let seen = wait_for(&events, |e| matches!(e, SessionEvent::Log(LogEvent::Skipped(_))));
    assert!(seen.contains(&SessionEvent::Log(LogEvent::Raw("1,2,3".into()))));
    assert!(seen.contains(&SessionEvent::Log(LogEvent::Skipped(
        RejectReason::MalformedLine { fields: 3 }
    ))));

    line_tx.send(Step::Line("1,2,x,4,0,0,0,0")).unwrap();
    wait_for(&events, |e| {
        matches!(
            e,
            SessionEvent::Log(LogEvent::Skipped(RejectReason::InvalidField { index: 2, .. }))
        )
    });

    assert!(provider.calls().is_empty());
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(connector.opens(), 1);
}

#[test]
fn blank_lines_are_ignored() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    let line_tx = connector.accept();
    let (session, events) = session(&connector, &provider, fast_config());

    session.start("/dev/ttyTEST").unwrap();
    wait_for_state(&events, &SessionState::Connected);

    line_tx.send(Step::Line("")).unwrap();
    line_tx.send(Step::Line("0,0,0,0,0,0,0,0")).unwrap();
    provider.wait_for_calls(8);

    let logs: Vec<_> = events
        .try_iter()
        .filter(|e| matches!(e, SessionEvent::Log(LogEvent::Skipped(_))))
        .collect();
    assert!(logs.is_empty());
}

#[test]
fn read_failure_reconnects_after_delay() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    let first = connector.accept();
    let second = connector.accept();
    let config = fast_config().with_retry_delay(Duration::from_millis(200));
    let (session, events) = session(&connector, &provider, config);

    session.start("/dev/ttyTEST").unwrap();
    wait_for_state(&events, &SessionState::Connected);
    assert_eq!((connector.live(), provider.live()), (1, 1));

    first.send(Step::Fail).unwrap();
    let seen = wait_for_failure(&events, FailureKind::TransportRead);
    assert!(seen.iter().any(|e| matches!(e, SessionEvent::Log(LogEvent::Error(_)))));
    assert_eq!(connector.live(), 0, "transport must be closed while failed");
    assert_eq!(provider.live(), 0, "sink must be released while failed");

    let seen = wait_for_state(&events, &SessionState::Connected);
    assert!(seen.contains(&SessionEvent::Log(LogEvent::Retrying {
        delay: Duration::from_millis(200)
    })));
    assert_eq!(
        states(&seen),
        vec![SessionState::Connecting, SessionState::Connected]
    );
    assert_eq!(connector.opens(), 2);
    assert_eq!(provider.acquired.load(Ordering::SeqCst), 2);
    assert_eq!((connector.live(), provider.live()), (1, 1));

    second.send(Step::Line("0,0,0,0,1,1,1,1")).unwrap();
    provider.wait_for_calls(8);

    session.stop();
    assert_eq!((connector.live(), provider.live()), (0, 0));
}

#[test]
fn open_failure_retries_until_port_appears() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    connector.refuse();
    connector.refuse();
    let _line_tx = connector.accept();
    let (session, events) = session(&connector, &provider, fast_config());

    session.start("/dev/ttyTEST").unwrap();
    let seen = wait_for_state(&events, &SessionState::Connected);
    let failures = states(&seen)
        .into_iter()
        .filter(|s| matches!(s, SessionState::Failed(f) if f.kind == FailureKind::TransportOpen))
        .count();
    assert_eq!(failures, 2);
    assert_eq!(connector.opens(), 3);
}

#[test]
fn sink_acquisition_failure_is_retried() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    provider.refuse.store(1, Ordering::SeqCst);
    let _first = connector.accept();
    let _second = connector.accept();
    let (session, events) = session(&connector, &provider, fast_config());

    session.start("/dev/ttyTEST").unwrap();
    wait_for_failure(&events, FailureKind::SinkAcquisition);
    wait_for_state(&events, &SessionState::Connected);
    assert_eq!(connector.opens(), 2);
}

#[test]
fn sink_write_failure_is_fatal_to_the_attempt() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    let first = connector.accept();
    let _second = connector.accept();
    let (session, events) = session(&connector, &provider, fast_config());

    session.start("/dev/ttyTEST").unwrap();
    wait_for_state(&events, &SessionState::Connected);

    provider.fail_writes.store(true, Ordering::SeqCst);
    first.send(Step::Line("1,1,1,1,0,0,0,0")).unwrap();
    wait_for_failure(&events, FailureKind::SinkWrite);

    provider.fail_writes.store(false, Ordering::SeqCst);
    wait_for_state(&events, &SessionState::Connected);
    assert_eq!(connector.opens(), 2);
}

#[test]
fn stop_during_retry_countdown_cancels_retry() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    connector.refuse();
    let config = fast_config().with_retry_delay(Duration::from_secs(30));
    let (session, events) = session(&connector, &provider, config);

    session.start("/dev/ttyTEST").unwrap();
    wait_for_failure(&events, FailureKind::TransportOpen);

    let started = Instant::now();
    session.stop();
    assert!(started.elapsed() < Duration::from_secs(5));

    let seen = wait_for_state(&events, &SessionState::Idle);
    assert_eq!(states(&seen), vec![SessionState::Idle]);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(connector.opens(), 1);
}

#[test]
fn stop_during_settle_delay_releases_port() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    let _line_tx = connector.accept();
    let config = fast_config().with_settle_delay(Duration::from_secs(30));
    let (session, events) = session(&connector, &provider, config);

    session.start("/dev/ttyTEST").unwrap();
    wait_for_state(&events, &SessionState::Connecting);
    session.stop();

    wait_for_state(&events, &SessionState::Idle);
    assert_eq!(provider.acquired.load(Ordering::SeqCst), 0);
    assert_eq!(connector.opens(), 1);
    assert_eq!(connector.live(), 0);
}

#[test]
fn policy_update_applies_to_next_frame() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    let line_tx = connector.accept();
    let (session, events) = session(&connector, &provider, fast_config());

    session.start("/dev/ttyTEST").unwrap();
    wait_for_state(&events, &SessionState::Connected);

    line_tx.send(Step::Line("0,0,1023,1023,0,0,0,0")).unwrap();
    provider.wait_for_calls(8);

    let policy = AxisPolicy {
        swap: true,
        axis1_enabled: true,
        axis2_enabled: false,
    };
    session.update_policy(policy);
    assert_eq!(session.policy(), policy);

    line_tx.send(Step::Line("0,0,1023,1023,0,0,0,0")).unwrap();
    let calls = provider.wait_for_calls(16);
    assert_eq!(
        calls[8..],
        frame_calls(32767, 32767, AXIS_CENTER, AXIS_CENTER, [false; 4])[..]
    );
}

#[test]
fn retry_ceiling_returns_to_idle() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    let config = fast_config().with_max_retries(Some(2));
    let (session, events) = session(&connector, &provider, config);

    session.start("/dev/ttyTEST").unwrap();
    let seen = wait_for_state(&events, &SessionState::Idle);
    assert!(seen.contains(&SessionEvent::Log(LogEvent::RetriesExhausted {
        attempts: 3
    })));
    assert_eq!(connector.opens(), 3);

    let deadline = Instant::now() + TIMEOUT;
    while session.is_running() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(!session.is_running());

    // A finished worker does not block a new start.
    let _line_tx = connector.accept();
    session.start("/dev/ttyTEST").unwrap();
    wait_for_state(&events, &SessionState::Connected);
}

#[test]
fn start_twice_is_rejected() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    let _line_tx = connector.accept();
    let (session, events) = session(&connector, &provider, fast_config());

    session.start("/dev/ttyA").unwrap();
    wait_for_state(&events, &SessionState::Connected);
    assert!(matches!(
        session.start("/dev/ttyB"),
        Err(SessionError::AlreadyRunning(port)) if port == "/dev/ttyA"
    ));
    assert_eq!(session.port().as_deref(), Some("/dev/ttyA"));
}

#[test]
fn toggle_starts_and_stops() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    let _line_tx = connector.accept();
    let (session, events) = session(&connector, &provider, fast_config());

    assert!(session.toggle("/dev/ttyTEST").unwrap());
    wait_for_state(&events, &SessionState::Connected);
    assert!(!session.toggle("/dev/ttyTEST").unwrap());
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn dropping_session_stops_worker() {
    let connector = ScriptedConnector::default();
    let provider = RecordingProvider::default();
    let _line_tx = connector.accept();
    let (session, events) = session(&connector, &provider, fast_config());

    session.start("/dev/ttyTEST").unwrap();
    wait_for_state(&events, &SessionState::Connected);
    drop(session);

    let seen: Vec<_> = events.iter().collect();
    assert_eq!(states(&seen).last(), Some(&SessionState::Idle));
}
