//! proctord - exam proctoring daemon
//!
//! This daemon:
//! 1. Captures frames from the configured camera on the main thread
//! 2. Runs face detection and evaluates the frame rules per frame
//! 3. Samples microphone chunks on a worker thread and applies the noise rule
//! 4. Posts each flagged violation to the remote API, best-effort
//! 5. Stops both loops on Ctrl-C or camera end-of-stream

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use proctor_kernel::{
    AudioMonitor, BackendRegistry, CameraSource, HttpReporter, ProctordConfig, ShutdownFlag,
    StubBackend, ViolationSink, VisualMonitor,
};

#[derive(Debug, Parser)]
#[command(name = "proctord", about = "Exam proctoring daemon", version)]
struct Args {
    /// Path to the JSON config file.
    #[arg(long, env = "PROCTOR_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = ProctordConfig::load(args.config.as_deref())?;

    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new());
    #[cfg(feature = "backend-tract")]
    if let Some(model_path) = &cfg.detector.model_path {
        registry.register(proctor_kernel::TractBackend::new(
            model_path,
            cfg.camera.width,
            cfg.camera.height,
        )?);
    }
    registry.set_default(&cfg.detector.backend)?;
    let detector = registry
        .default_backend()
        .ok_or_else(|| anyhow!("no detector backend available"))?;
    detector
        .lock()
        .map_err(|_| anyhow!("detector lock poisoned"))?
        .warm_up()?;

    let session = cfg.candidate_session();
    let reporter: Arc<dyn ViolationSink> =
        Arc::new(HttpReporter::new(&cfg.api.url, &cfg.api.token)?);

    log::info!(
        "proctord running: student_id={} exam_id={} detector={} api={}",
        session.student_id,
        session.exam_id,
        cfg.detector.backend,
        cfg.api.url
    );

    let shutdown = ShutdownFlag::new();
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || {
            log::info!("shutdown requested");
            flag.trip();
        })
        .context("register Ctrl-C handler")?;
    }

    let audio_handle = AudioMonitor::new(
        cfg.audio_config(),
        reporter.clone(),
        session,
        shutdown.clone(),
    )
    .spawn()?;

    let camera = CameraSource::new(cfg.camera_config())?;
    let mut visual = VisualMonitor::new(camera, detector, reporter, session, shutdown.clone());
    let result = visual.run();

    // Stop the worker too before exiting, whatever ended the visual loop.
    shutdown.trip();
    if audio_handle.join().is_err() {
        log::error!("audio monitor thread panicked");
    }

    result
}
