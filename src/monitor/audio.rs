//! Audio monitor: the background noise-level loop.

use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};

use crate::ingest::{volume_proxy, AudioConfig, MicrophoneSource};
use crate::report::{CandidateSession, ViolationKind, ViolationSink};
use crate::shutdown::ShutdownFlag;

/// Volume proxy above which a chunk counts as background noise.
pub const NOISE_VOLUME_THRESHOLD: f32 = 20.0;

/// The background monitoring loop.
///
/// Runs on its own worker thread for the lifetime of the process. Each
/// iteration blocks for the next audio chunk, computes the volume proxy, and
/// reports Background Noise when the proxy crosses the threshold. Decisions
/// are independent per chunk; there is deliberately no debouncing.
///
/// The worker owns its microphone source (capture streams are not `Send`, so
/// the source is constructed on the worker thread). It stops when the
/// shutdown flag trips, the stream ends, or the backend fails; a backend
/// failure is logged at error level so the worker never dies silently.
pub struct AudioMonitor {
    config: AudioConfig,
    sink: Arc<dyn ViolationSink>,
    session: CandidateSession,
    shutdown: ShutdownFlag,
}

impl AudioMonitor {
    pub fn new(
        config: AudioConfig,
        sink: Arc<dyn ViolationSink>,
        session: CandidateSession,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            config,
            sink,
            session,
            shutdown,
        }
    }

    /// Spawn the monitor on a named worker thread.
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("audio-monitor".to_string())
            .spawn(move || {
                if let Err(err) = self.run() {
                    log::error!("audio monitor stopped: {:#}", err);
                }
            })
            .context("spawn audio monitor thread")
    }

    /// Run until end-of-stream, shutdown request, or a backend error.
    pub fn run(self) -> Result<()> {
        let mut source = MicrophoneSource::new(self.config)?;
        source.connect()?;

        loop {
            if self.shutdown.is_tripped() {
                log::info!("audio monitor: shutdown requested");
                break;
            }

            let chunk = match source.next_chunk()? {
                Some(chunk) => chunk,
                None => {
                    log::info!("audio monitor: audio stream ended");
                    break;
                }
            };

            let volume = volume_proxy(&chunk.samples);
            if volume > NOISE_VOLUME_THRESHOLD {
                log::debug!("noise threshold crossed: volume proxy {:.1}", volume);
                let violation = self
                    .session
                    .violation(ViolationKind::BackgroundNoise, "High audio level detected");
                self.sink.report(&violation);
            }
        }

        Ok(())
    }
}
