#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{DetectorParams, FaceDetectorBackend};
use crate::detect::result::FaceBox;
use crate::frame::Frame;

/// Tract-based backend for ONNX face detection.
///
/// Loads a local model file and runs inference on grayscale frames. The model
/// is expected to take a `1x3xHxW` f32 input (the grayscale channel is
/// replicated) and produce an `Nx5` output of normalized
/// `[x1, y1, x2, y2, score]` rows. Boxes below the confidence threshold are
/// dropped. No network I/O; no writes beyond model loading.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            confidence_threshold: 0.5,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.width != self.width || frame.height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                frame.width,
                frame.height,
                self.width,
                self.height
            ));
        }

        let width = frame.width as usize;
        let pixels = frame.pixels();
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, frame.height as usize, width),
            |(_, _channel, y, x)| pixels[y * width + x] as f32 / 255.0,
        );

        Ok(input.into_tensor())
    }

    fn extract_faces(&self, outputs: TVec<TValue>) -> Result<Vec<FaceBox>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let rows = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let rows = rows
            .to_shape((rows.len() / 5, 5))
            .context("model output was not Nx5")?;

        let mut faces = Vec::new();
        for row in rows.rows() {
            let score = row[4];
            if score < self.confidence_threshold {
                continue;
            }
            let x1 = (row[0].clamp(0.0, 1.0) * self.width as f32) as u32;
            let y1 = (row[1].clamp(0.0, 1.0) * self.height as f32) as u32;
            let x2 = (row[2].clamp(0.0, 1.0) * self.width as f32) as u32;
            let y2 = (row[3].clamp(0.0, 1.0) * self.height as f32) as u32;
            if x2 <= x1 || y2 <= y1 {
                continue;
            }
            faces.push(FaceBox::new(x1, y1, x2 - x1, y2 - y1));
        }
        Ok(faces)
    }
}

impl FaceDetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame, _params: &DetectorParams) -> Result<Vec<FaceBox>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.extract_faces(outputs)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = Frame::from_gray(
            vec![0u8; (self.width * self.height) as usize],
            self.width,
            self.height,
        )?;
        self.detect(&blank, &DetectorParams::default())?;
        Ok(())
    }
}
