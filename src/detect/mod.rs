//! Face detection as an opaque capability.
//!
//! The monitoring loop never sees how faces are found: a grayscale frame goes
//! into a [`FaceDetectorBackend`] and a set of bounding boxes comes out.
//! Backends register in a [`BackendRegistry`] and are selected by name from
//! configuration.

mod backend;
mod backends;
mod registry;
mod result;

pub use backend::{DetectorParams, FaceDetectorBackend, MIN_NEIGHBORS, SCALE_FACTOR};
pub use backends::ScriptedBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use registry::BackendRegistry;
pub use result::FaceBox;
