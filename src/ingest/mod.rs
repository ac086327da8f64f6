//! Capture sources.
//!
//! This module provides the two device inputs the kernel monitors:
//! - camera frames ([`CameraSource`]: V4L2 devices, `stub://` synthetic)
//! - microphone chunks ([`MicrophoneSource`]: cpal, `stub://` synthetic)
//!
//! Both sources follow the same shape: enum dispatch over a hardware backend
//! behind a feature gate and an always-available synthetic backend selected
//! by a `stub://` device string. Synthetic devices accept a budget suffix
//! (`?frames=N` / `?chunks=N`) so tests can run against finite streams.

mod audio;
mod camera;

pub use audio::{volume_proxy, AudioChunk, AudioConfig, AudioStats, MicrophoneSource};
pub use camera::{CameraConfig, CameraSource, CameraStats};
