//! Visual monitor: the main capture → detect → evaluate → report loop.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::detect::{DetectorParams, FaceDetectorBackend};
use crate::ingest::CameraSource;
use crate::monitor::rules::FrameRules;
use crate::report::{CandidateSession, ViolationSink};
use crate::shutdown::ShutdownFlag;

/// Cadence of the periodic source-health log line.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// The foreground monitoring loop.
///
/// Owns the camera and the look-away rule state. Each iteration captures one
/// frame, runs the detector, evaluates the frame rules, and hands any firings
/// to the violation sink. The loop ends when the camera reports end-of-stream
/// or the shutdown flag trips.
///
/// Failure policy (explicit, per failure kind):
/// - capture `Ok(None)`: definitive end-of-stream, stop gracefully
/// - capture `Err`: stop with the error
/// - detection `Err`: skip the frame and continue, logged with a
///   consecutive-failure count
pub struct VisualMonitor {
    source: CameraSource,
    detector: Arc<Mutex<dyn FaceDetectorBackend>>,
    params: DetectorParams,
    sink: Arc<dyn ViolationSink>,
    session: CandidateSession,
    rules: FrameRules,
    shutdown: ShutdownFlag,
}

impl VisualMonitor {
    pub fn new(
        source: CameraSource,
        detector: Arc<Mutex<dyn FaceDetectorBackend>>,
        sink: Arc<dyn ViolationSink>,
        session: CandidateSession,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            source,
            detector,
            params: DetectorParams::default(),
            sink,
            session,
            rules: FrameRules::new(),
            shutdown,
        }
    }

    /// Run until end-of-stream, shutdown request, or a capture error.
    pub fn run(&mut self) -> Result<()> {
        self.source.connect()?;

        let mut last_health_log = Instant::now();
        let mut detect_failures = 0u32;

        loop {
            if self.shutdown.is_tripped() {
                log::info!("visual monitor: shutdown requested");
                break;
            }

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("visual monitor: camera stream ended");
                    break;
                }
                Err(err) => {
                    log::error!("visual monitor: frame capture failed: {:#}", err);
                    return Err(err);
                }
            };

            let faces = {
                let mut detector = self
                    .detector
                    .lock()
                    .map_err(|_| anyhow!("detector lock poisoned"))?;
                match detector.detect(&frame, &self.params) {
                    Ok(faces) => {
                        detect_failures = 0;
                        faces
                    }
                    Err(err) => {
                        // Skip-frame-and-continue: one bad frame from an
                        // unreliable native capture stack must not kill the
                        // exam session.
                        detect_failures += 1;
                        log::warn!(
                            "face detection failed ({} consecutive): {:#}",
                            detect_failures,
                            err
                        );
                        continue;
                    }
                }
            };

            let now = Instant::now();
            for decision in self.rules.evaluate(&faces, frame.width, now) {
                let violation = self.session.violation(decision.kind, decision.details);
                self.sink.report(&violation);
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.source.stats();
                log::info!(
                    "camera health={} frames={} device={}",
                    self.source.is_healthy(),
                    stats.frames_captured,
                    stats.device
                );
                last_health_log = Instant::now();
            }
        }

        Ok(())
    }
}
