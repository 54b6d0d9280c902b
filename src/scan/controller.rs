use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::session::{ScanSession, SessionState};
use super::{ScanCallback, ScanHit, ScanOutcome};
use crate::config::ScanConfig;
use crate::detector::Detector;
use crate::error::ScanError;
use crate::source::{SourceConfig, SourceHandle, Sources};
use crate::{DecodeResult, FrameDecoder};

/// A running session: its shared state, the cancel line to its worker and
/// the worker itself
struct Active {
    session: Arc<ScanSession>,
    cancel: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl Active {
    /// Cancel, wait for the worker (which closes the source) and return the
    /// callback if it never fired
    fn shutdown(self) -> Option<ScanCallback> {
        let Active {
            session,
            cancel,
            worker,
        } = self;
        let unfired = session.cancel();
        // disconnecting wakes a worker sleeping between frames
        drop(cancel);
        if let Some(worker) = worker {
            // stop() from inside the callback runs on the worker itself
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                warn!(session = session.id(), "scan worker panicked");
            }
        }
        session.advance(SessionState::Idle);
        unfired
    }
}

struct Inner {
    active: Option<Active>,
    /// State reported when no session is held
    settled: SessionState,
}

/// Scan controller.
///
/// Owns the source capabilities and the decoder, and runs at most one scan
/// session at a time on a worker thread. Control calls (`start`, `stop`,
/// `switch_source`) are meant to come from one thread at a time; the result
/// callback may call them too.
pub struct Scanner {
    sources: Mutex<Sources>,
    decoder: Arc<dyn FrameDecoder>,
    config: ScanConfig,
    inner: Mutex<Inner>,
    next_id: AtomicU64,
}

impl Scanner {
    /// Scanner with the default detector and the default cadence
    pub fn new(sources: Sources) -> Self {
        Self {
            sources: Mutex::new(sources),
            decoder: Arc::new(Detector::default()),
            config: ScanConfig::default(),
            inner: Mutex::new(Inner {
                active: None,
                settled: SessionState::Idle,
            }),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_decoder(mut self, decoder: impl FrameDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// State of the current (or last) session
    pub fn state(&self) -> SessionState {
        let inner = self.inner.lock();
        match &inner.active {
            Some(active) => active.session.state(),
            None => inner.settled,
        }
    }

    /// Whether a session is acquiring or decoding
    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    /// Start a session on `config`, stopping any previous one first.
    ///
    /// The source is opened before this returns. If that fails the error is
    /// returned, the session is `Failed` and `on_result` is dropped without
    /// being called. Otherwise `on_result` receives exactly one outcome.
    pub fn start<F>(&self, config: SourceConfig, on_result: F) -> Result<(), ScanError>
    where
        F: FnOnce(ScanOutcome) + Send + 'static,
    {
        self.stop();
        self.launch(config, Box::new(on_result))
    }

    /// Cancel the running session, if any, and release its source.
    ///
    /// A callback that has not fired yet receives `Err(Cancelled)`; a decode
    /// in flight is discarded.
    pub fn stop(&self) {
        if let Some(callback) = self.detach() {
            callback(Err(ScanError::Cancelled));
        }
    }

    /// Stop the running session and start a new one on `config` with the
    /// same result callback. The old source is closed before the new one is
    /// opened.
    pub fn switch_source(&self, config: SourceConfig) -> Result<(), ScanError> {
        let Some(callback) = self.detach() else {
            return Err(ScanError::NoActiveSession);
        };
        info!(source = config.kind(), "switching source");
        self.launch(config, callback)
    }

    /// Run one session and wait for its outcome
    pub fn scan_blocking(&self, config: SourceConfig) -> ScanOutcome {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.start(config, move |outcome| {
            let _ = tx.send(outcome);
        })?;
        rx.recv().unwrap_or(Err(ScanError::Cancelled))
    }

    /// Tear down the held session; returns its unfired callback
    fn detach(&self) -> Option<ScanCallback> {
        let active = {
            let mut inner = self.inner.lock();
            inner.settled = SessionState::Idle;
            inner.active.take()
        }?;
        debug!(session = active.session.id(), "stopping session");
        active.shutdown()
    }

    fn launch(&self, config: SourceConfig, callback: ScanCallback) -> Result<(), ScanError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let kind = config.kind();

        let source = match self.sources.lock().open(config) {
            Ok(source) => source,
            Err(err) => {
                warn!(session = id, source = kind, error = %err, "scan could not start");
                self.inner.lock().settled = SessionState::Failed;
                return Err(err);
            }
        };

        let session = Arc::new(ScanSession::new(id, callback));
        session.advance(SessionState::Acquiring);
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(0);
        let worker = thread::Builder::new()
            .name(format!("qr-scan-{id}"))
            .spawn({
                let session = Arc::clone(&session);
                let decoder = Arc::clone(&self.decoder);
                let config = self.config;
                move || run_session(session, source, decoder, config, cancel_rx)
            })
            .map_err(|e| {
                self.inner.lock().settled = SessionState::Failed;
                ScanError::DeviceUnavailable(format!("cannot spawn scan worker: {e}"))
            })?;

        info!(session = id, source = kind, "scan started");
        let displaced = self.inner.lock().active.replace(Active {
            session,
            cancel: cancel_tx,
            worker: Some(worker),
        });
        if let Some(displaced) = displaced.and_then(Active::shutdown) {
            displaced(Err(ScanError::Cancelled));
        }
        Ok(())
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

fn cancel_requested(cancel: &Receiver<()>) -> bool {
    !matches!(cancel.try_recv(), Err(TryRecvError::Empty))
}

/// Worker loop: acquire, decode, wait, until a terminal outcome or cancel.
/// The source is closed on every exit path before the callback runs.
fn run_session(
    session: Arc<ScanSession>,
    mut source: SourceHandle,
    decoder: Arc<dyn FrameDecoder>,
    config: ScanConfig,
    cancel: Receiver<()>,
) {
    let id = session.id();
    let started = Instant::now();
    let mut attempts = 0u64;

    let outcome: ScanOutcome = loop {
        if cancel_requested(&cancel) {
            debug!(session = id, attempts, "cancelled");
            return;
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break Err(ScanError::NotFound),
            Err(err) => break Err(err),
        };

        session.advance(SessionState::Decoding);
        attempts += 1;
        let tick = Instant::now();
        if let DecodeResult::Found(code) = decoder.decode(&frame) {
            break Ok(ScanHit {
                code,
                frame_sequence: frame.sequence(),
                attempts,
                elapsed: started.elapsed(),
            });
        }
        trace!(session = id, sequence = frame.sequence(), "no code in frame");
        session.advance(SessionState::Acquiring);

        // finite sources run until they are exhausted
        if !source.paced() {
            continue;
        }
        let out_of_attempts = config.max_attempts.is_some_and(|max| attempts >= max);
        let out_of_time = config.timeout.is_some_and(|t| started.elapsed() >= t);
        if out_of_attempts || out_of_time {
            break Err(ScanError::DecodeTimeout { attempts });
        }
        let wait = config.interval.saturating_sub(tick.elapsed());
        match cancel.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                debug!(session = id, attempts, "cancelled while waiting");
                return;
            }
        }
    };

    source.close();
    match &outcome {
        Ok(hit) => {
            session.advance(SessionState::Found);
            info!(
                session = id,
                attempts,
                sequence = hit.frame_sequence,
                version = hit.code.version.number(),
                "code found"
            );
        }
        Err(err) => {
            session.advance(SessionState::Failed);
            warn!(session = id, attempts, error = %err, "scan failed");
        }
    }
    if !session.deliver(outcome) {
        debug!(session = id, "outcome discarded after cancel");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frame, QRCode};
    use crate::source::{CameraConfig, ReplayCamera};
    use std::time::Duration;

    /// Decoder that fails every frame
    struct Never;

    impl FrameDecoder for Never {
        fn decode(&self, _frame: &Frame) -> DecodeResult {
            DecodeResult::NotFound
        }
    }

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|_| Frame::from_luma(30, 30, vec![255; 900]).unwrap())
            .collect()
    }

    fn fast() -> ScanConfig {
        ScanConfig::default().with_interval(Duration::from_millis(5))
    }

    #[test]
    fn test_photo_without_code_is_not_found() {
        let scanner = Scanner::new(Sources::photo_only()).with_decoder(Never);
        let outcome = scanner.scan_blocking(SourceConfig::Photo(frames(1).remove(0)));
        assert!(matches!(outcome, Err(ScanError::NotFound)));
        assert_eq!(scanner.state(), SessionState::Failed);
    }

    #[test]
    fn test_attempt_bound() {
        let camera = ReplayCamera::new(frames(2)).looping();
        let scanner = Scanner::new(Sources::with_camera(camera))
            .with_decoder(Never)
            .with_config(fast().with_max_attempts(3));
        let outcome = scanner.scan_blocking(CameraConfig::default().into());
        assert!(matches!(outcome, Err(ScanError::DecodeTimeout { attempts: 3 })));
    }

    #[test]
    fn test_switch_without_session() {
        let scanner = Scanner::new(Sources::photo_only());
        assert!(matches!(
            scanner.switch_source(CameraConfig::default().into()),
            Err(ScanError::NoActiveSession)
        ));
    }

    #[test]
    fn test_camera_missing_fails_start() {
        let scanner = Scanner::new(Sources::photo_only());
        let err = scanner
            .start(CameraConfig::default().into(), |_| panic!("callback must not run"))
            .unwrap_err();
        assert!(err.is_acquisition());
        assert_eq!(scanner.state(), SessionState::Failed);
        scanner.stop();
        assert_eq!(scanner.state(), SessionState::Idle);
    }

    #[test]
    fn test_stop_notifies_cancel() {
        let camera = ReplayCamera::new(frames(1)).looping();
        let scanner = Scanner::new(Sources::with_camera(camera))
            .with_decoder(Never)
            .with_config(fast());
        let (tx, rx) = crossbeam_channel::bounded(1);
        scanner
            .start(CameraConfig::default().into(), move |outcome| {
                let _ = tx.send(outcome);
            })
            .unwrap();
        assert!(scanner.is_running());
        scanner.stop();
        assert!(matches!(rx.recv().unwrap(), Err(ScanError::Cancelled)));
        assert_eq!(scanner.state(), SessionState::Idle);
    }

    #[test]
    fn test_hit_reports_frame_sequence() {
        /// Finds a code on the third frame
        struct Third;

        impl FrameDecoder for Third {
            fn decode(&self, frame: &Frame) -> DecodeResult {
                if frame.sequence() < 2 {
                    return DecodeResult::NotFound;
                }
                DecodeResult::Found(QRCode {
                    data: b"MCN-001".to_vec(),
                    content: "MCN-001".into(),
                    version: crate::models::Version::new(1).unwrap(),
                    error_correction: crate::models::ECLevel::M,
                    mask_pattern: crate::models::MaskPattern::Pattern0,
                    position: [crate::models::Point::new(0.0, 0.0); 4],
                    modules: crate::models::BitMatrix::new(21, 21),
                })
            }
        }

        let camera = ReplayCamera::new(frames(5));
        let scanner = Scanner::new(Sources::with_camera(camera))
            .with_decoder(Third)
            .with_config(fast());
        let hit = scanner.scan_blocking(CameraConfig::default().into()).unwrap();
        assert_eq!(hit.payload(), "MCN-001");
        assert_eq!(hit.frame_sequence, 2);
        assert_eq!(hit.attempts, 3);
        assert_eq!(scanner.state(), SessionState::Found);
    }
}
