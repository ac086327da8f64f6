//! Camera frame source.
//!
//! `CameraSource` produces grayscale [`Frame`]s for the visual monitor:
//! - `stub://` devices select a synthetic source that scripts a moving face
//!   marker (no camera hardware needed)
//! - real device paths (e.g. `/dev/video0`) use V4L2 behind the
//!   `ingest-v4l2` feature
//!
//! `next_frame` returning `Ok(None)` is the definitive end-of-stream signal:
//! the capture device has been exhausted and the visual loop should stop
//! gracefully rather than retry.

use anyhow::{anyhow, Result};
#[cfg(feature = "ingest-v4l2")]
use anyhow::Context;
use std::time::Duration;
#[cfg(feature = "ingest-v4l2")]
use std::time::Instant;

use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g. "/dev/video0") or a `stub://` synthetic device.
    /// Synthetic devices accept a `?frames=N` suffix to end the stream after
    /// N frames.
    pub device: String,
    /// Target frame rate (frames per second).
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "stub://candidate".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Camera frame source.
///
/// Uses V4L2 for real devices, with a synthetic fallback for `stub://` paths.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCameraSource),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceCameraSource),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCameraSource::new(config)?),
            })
        } else {
            #[cfg(feature = "ingest-v4l2")]
            {
                Ok(Self {
                    backend: CameraBackend::Device(DeviceCameraSource::new(config)?),
                })
            }
            #[cfg(not(feature = "ingest-v4l2"))]
            {
                Err(anyhow!(
                    "camera device '{}' requires the ingest-v4l2 feature",
                    config.device
                ))
            }
        }
    }

    /// Connect to the camera.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.connect(),
        }
    }

    /// Capture the next frame. `Ok(None)` means the stream has ended.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

/// Parse an optional `?<key>=N` suffix from a `stub://` device string.
/// Returns the bare device name and the budget, if any.
pub(crate) fn parse_stub_budget<'a>(device: &'a str, key: &str) -> Result<(&'a str, Option<u64>)> {
    let Some((name, query)) = device.split_once('?') else {
        return Ok((device, None));
    };
    let Some((query_key, value)) = query.split_once('=') else {
        return Err(anyhow!("malformed stub device query '{}'", device));
    };
    if query_key != key {
        return Err(anyhow!(
            "unsupported stub device parameter '{}'; expected '{}'",
            query_key,
            key
        ));
    }
    let budget: u64 = value
        .parse()
        .map_err(|_| anyhow!("stub device budget '{}' is not a number", value))?;
    Ok((name, Some(budget)))
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and model-free runs
// ----------------------------------------------------------------------------

/// Marker square edge length in pixels.
const MARKER_SIZE: u32 = 80;
/// Background and marker gray levels; the marker must clear the stub
/// detector's brightness threshold.
const BACKGROUND_LEVEL: u8 = 40;
const MARKER_LEVEL: u8 = 230;
/// Horizontal offset of the marker during the off-center phase.
const OFF_CENTER_OFFSET: u32 = 200;
/// Frames per scripted phase cycle: the first part centered, the tail
/// off-center.
const PHASE_CYCLE: u64 = 40;
const PHASE_CENTERED: u64 = 30;

struct SyntheticCameraSource {
    config: CameraConfig,
    frame_count: u64,
    /// Total frames before the stream ends; `None` streams forever.
    budget: Option<u64>,
}

impl SyntheticCameraSource {
    fn new(config: CameraConfig) -> Result<Self> {
        let (_, budget) = parse_stub_budget(&config.device, "frames")?;
        Ok(Self {
            config,
            frame_count: 0,
            budget,
        })
    }

    /// Synthetic sources are always "connected".
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "CameraSource: connected to {} (synthetic)",
            self.config.device
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(budget) = self.budget {
            if self.frame_count >= budget {
                return Ok(None);
            }
        } else if self.config.target_fps > 0 {
            // Live synthetic runs pace to the target rate; budgeted sources
            // exist for tests and do not sleep.
            std::thread::sleep(Duration::from_secs_f64(
                1.0 / f64::from(self.config.target_fps),
            ));
        }

        let pixels = self.generate_synthetic_pixels();
        self.frame_count += 1;
        Ok(Some(Frame::from_gray(
            pixels,
            self.config.width,
            self.config.height,
        )?))
    }

    /// Generate synthetic pixel data for testing.
    ///
    /// Simulates a candidate by drawing one bright square marker on a dark
    /// background. The marker follows a scripted cycle: mostly centered, then
    /// off-center for the tail of each cycle, so a full pipeline run
    /// exercises both gaze states.
    fn generate_synthetic_pixels(&self) -> Vec<u8> {
        let width = self.config.width;
        let height = self.config.height;
        let mut pixels = vec![BACKGROUND_LEVEL; (width * height) as usize];

        let phase = self.frame_count % PHASE_CYCLE;
        let offset = if phase < PHASE_CENTERED {
            0
        } else {
            OFF_CENTER_OFFSET
        };

        let marker_center_x = (width / 2 + offset).min(width.saturating_sub(MARKER_SIZE / 2 + 1));
        let left = marker_center_x.saturating_sub(MARKER_SIZE / 2);
        let top = (height / 2).saturating_sub(MARKER_SIZE / 2);
        for y in top..(top + MARKER_SIZE).min(height) {
            for x in left..(left + MARKER_SIZE).min(width) {
                pixels[(y * width + x) as usize] = MARKER_LEVEL;
            }
        }
        pixels
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Production V4L2 source using libv4l
// ----------------------------------------------------------------------------

#[cfg(feature = "ingest-v4l2")]
struct DeviceCameraSource {
    config: CameraConfig,
    state: Option<DeviceCameraState>,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[cfg(feature = "ingest-v4l2")]
#[ouroboros::self_referencing]
struct DeviceCameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "ingest-v4l2")]
impl DeviceCameraSource {
    fn new(config: CameraConfig) -> Result<Self> {
        Ok(Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        })
    }

    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open camera device {}", self.config.device))?;
        let mut format = device.format().context("read camera format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read camera format after set failure")?
            }
        };

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = DeviceCameraStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create camera buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "CameraSource: connected to {} ({}x{})",
            self.config.device,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("camera device not connected")?;
        let buf = match state.with_mut(|fields| fields.stream.next().map(|(buf, _meta)| buf.to_vec()))
        {
            Ok(buf) => buf,
            Err(err) => {
                // A dead capture stream is end-of-stream, not a transient
                // error: the device has been exhausted or unplugged.
                self.last_error = Some(err.to_string());
                log::warn!(
                    "CameraSource: capture from {} failed: {}",
                    self.config.device,
                    err
                );
                return Ok(None);
            }
        };

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());

        let frame = Frame::from_rgb(&buf, self.active_width, self.active_height)?;
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        match self.last_frame_at {
            Some(last_frame_at) => last_frame_at.elapsed() < Duration::from_secs(5),
            None => true,
        }
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config(device: &str) -> CameraConfig {
        CameraConfig {
            device: device.to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }

    #[test]
    fn parses_budget_suffix() {
        assert_eq!(
            parse_stub_budget("stub://candidate?frames=12", "frames").unwrap(),
            ("stub://candidate", Some(12))
        );
        assert_eq!(
            parse_stub_budget("stub://candidate", "frames").unwrap(),
            ("stub://candidate", None)
        );
        assert!(parse_stub_budget("stub://candidate?chunks=3", "frames").is_err());
        assert!(parse_stub_budget("stub://candidate?frames=many", "frames").is_err());
    }

    #[test]
    fn budgeted_stream_ends() {
        let mut source = CameraSource::new(stub_config("stub://candidate?frames=3")).unwrap();
        source.connect().unwrap();
        for _ in 0..3 {
            assert!(source.next_frame().unwrap().is_some());
        }
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.stats().frames_captured, 3);
        assert!(source.is_healthy());
    }

    #[test]
    fn synthetic_marker_is_centered_then_off_center() {
        use crate::detect::{DetectorParams, FaceDetectorBackend, StubBackend};

        let mut source = CameraSource::new(stub_config("stub://candidate?frames=40")).unwrap();
        source.connect().unwrap();
        let mut detector = StubBackend::new();
        let params = DetectorParams::default();

        let first = source.next_frame().unwrap().unwrap();
        let faces = detector.detect(&first, &params).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].center_x(), first.center_x());

        // Skip to the off-center phase of the cycle.
        for _ in 1..30 {
            source.next_frame().unwrap().unwrap();
        }
        let late = source.next_frame().unwrap().unwrap();
        let faces = detector.detect(&late, &params).unwrap();
        assert_eq!(faces.len(), 1);
        assert!(faces[0].center_x() > late.center_x() + 150);
    }
}
