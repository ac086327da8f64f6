//! Proctor Kernel
//!
//! This crate implements a minimal exam-proctoring daemon: it samples a
//! webcam feed and a microphone stream, applies simple heuristics to flag
//! candidate violations, and posts each flagged event to a remote API.
//!
//! Detection and capture are opaque external capabilities: face detection is
//! a pluggable backend (grayscale frame in, bounding boxes out) and both
//! device inputs have synthetic `stub://` fallbacks, so the whole pipeline
//! runs and tests without camera hardware, audio hardware, or a model file.
//!
//! # Module Structure
//!
//! - `config`: process-wide configuration, fixed at startup
//! - `frame`: the per-iteration grayscale frame container
//! - `ingest`: camera and microphone sources
//! - `detect`: face detector backends and their registry
//! - `monitor`: the visual loop, the audio worker, and the frame rules
//! - `report`: violation records and the fire-and-forget HTTP reporter
//! - `shutdown`: the cooperative stop flag shared by both loops
//!
//! # Rules
//!
//! Three fixed-threshold rules produce violations:
//!
//! 1. **Multiple Faces**: more than one detected face box in a frame;
//!    reported every qualifying frame, no debounce.
//! 2. **Looking Away**: the primary face off-center by more than 150 pixel
//!    units continuously for more than 3 seconds; one report per streak.
//! 3. **Background Noise**: an audio chunk's volume proxy above 20; one
//!    report per qualifying chunk.

pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod monitor;
pub mod report;
pub mod shutdown;

pub use config::ProctordConfig;
pub use detect::{
    BackendRegistry, DetectorParams, FaceBox, FaceDetectorBackend, ScriptedBackend, StubBackend,
};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use frame::Frame;
pub use ingest::{
    volume_proxy, AudioChunk, AudioConfig, CameraConfig, CameraSource, MicrophoneSource,
};
pub use monitor::{
    AudioMonitor, FrameRules, VisualMonitor, LOOK_AWAY_DURATION, NOISE_VOLUME_THRESHOLD,
    OFF_CENTER_PX,
};
pub use report::{
    CandidateSession, HttpReporter, NullSink, RecordingSink, Violation, ViolationKind,
    ViolationSink,
};
pub use shutdown::ShutdownFlag;
