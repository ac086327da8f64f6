use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::detect::backend::{DetectorParams, FaceDetectorBackend};
use crate::detect::result::FaceBox;
use crate::frame::Frame;

/// One scripted detector response.
enum ScriptStep {
    Faces(Vec<FaceBox>),
    Fail(String),
}

/// Replays a fixed script of detector responses, one per frame.
///
/// Drives the monitoring tests: each `detect` call pops the next step, so a
/// test can lay out an exact per-frame sequence of face sets (or injected
/// failures). Once the script runs dry the backend reports no faces.
pub struct ScriptedBackend {
    script: VecDeque<ScriptStep>,
}

impl ScriptedBackend {
    pub fn new(frames: Vec<Vec<FaceBox>>) -> Self {
        Self {
            script: frames.into_iter().map(ScriptStep::Faces).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Append a frame's worth of detections to the script.
    pub fn push_faces(&mut self, faces: Vec<FaceBox>) {
        self.script.push_back(ScriptStep::Faces(faces));
    }

    /// Append a detection failure to the script.
    pub fn push_failure(&mut self, message: impl Into<String>) {
        self.script.push_back(ScriptStep::Fail(message.into()));
    }
}

impl FaceDetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame, _params: &DetectorParams) -> Result<Vec<FaceBox>> {
        match self.script.pop_front() {
            Some(ScriptStep::Faces(faces)) => Ok(faces),
            Some(ScriptStep::Fail(message)) => Err(anyhow!(message)),
            None => Ok(Vec::new()),
        }
    }
}
