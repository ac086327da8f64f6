use anyhow::Result;

use crate::detect::result::FaceBox;
use crate::frame::Frame;

/// Detector tuning used by every backend, fixed for the lifetime of the
/// process. These are not runtime-configurable.
pub const SCALE_FACTOR: f32 = 1.3;
pub const MIN_NEIGHBORS: u32 = 5;

/// Tuning parameters forwarded to detection backends.
///
/// Backends are opaque: a cascade-style detector honours both values, other
/// backends apply whatever subset makes sense for their algorithm.
#[derive(Clone, Copy, Debug)]
pub struct DetectorParams {
    /// Pyramid step between detection scales.
    pub scale_factor: f32,
    /// Minimum supporting neighbors for a candidate to survive.
    pub min_neighbors: u32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            scale_factor: SCALE_FACTOR,
            min_neighbors: MIN_NEIGHBORS,
        }
    }
}

/// Face detector backend trait.
///
/// The detector is a black box to the monitoring loop: a grayscale frame goes
/// in, a set of bounding boxes comes out. Implementations may be stateful
/// (tracking across frames), hence `&mut self`.
///
/// Implementations must treat the frame as read-only and ephemeral: nothing
/// may be retained beyond the `detect` call.
pub trait FaceDetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Detect faces in one grayscale frame.
    fn detect(&mut self, frame: &Frame, params: &DetectorParams) -> Result<Vec<FaceBox>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
