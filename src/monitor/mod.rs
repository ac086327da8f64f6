//! The two monitoring loops.
//!
//! The visual monitor runs in the foreground (it owns the camera); the audio
//! monitor runs on a worker thread. They share no mutable state (each calls
//! the violation sink independently), and both observe the same
//! [`ShutdownFlag`](crate::shutdown::ShutdownFlag) so the process can stop
//! them deterministically.

mod audio;
mod rules;
mod visual;

pub use audio::{AudioMonitor, NOISE_VOLUME_THRESHOLD};
pub use rules::{FrameRules, RuleDecision, LOOK_AWAY_DURATION, OFF_CENTER_PX};
pub use visual::VisualMonitor;
