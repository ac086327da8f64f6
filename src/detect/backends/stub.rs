use anyhow::Result;

use crate::detect::backend::{DetectorParams, FaceDetectorBackend};
use crate::detect::result::FaceBox;
use crate::frame::Frame;

/// Pixel value above which a pixel counts as part of a marker.
const BRIGHT_THRESHOLD: u8 = 200;

/// Stub backend for testing and model-free runs.
///
/// Pairs with the synthetic camera source: it treats bright rectangular
/// markers on a dark background as faces. Detection is a thresholded
/// column-projection scan, so horizontally separated markers yield separate
/// boxes. `scale_factor` is ignored; `min_neighbors` is applied as the
/// minimum marker width in pixels.
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceDetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame, params: &DetectorParams) -> Result<Vec<FaceBox>> {
        let width = frame.width as usize;
        let height = frame.height as usize;
        let pixels = frame.pixels();

        // Columns containing at least one bright pixel.
        let mut bright_column = vec![false; width];
        for y in 0..height {
            let row = &pixels[y * width..(y + 1) * width];
            for (x, &p) in row.iter().enumerate() {
                if p > BRIGHT_THRESHOLD {
                    bright_column[x] = true;
                }
            }
        }

        let mut faces = Vec::new();
        let mut x = 0usize;
        while x < width {
            if !bright_column[x] {
                x += 1;
                continue;
            }
            let run_start = x;
            while x < width && bright_column[x] {
                x += 1;
            }
            let run_width = x - run_start;
            if (run_width as u32) < params.min_neighbors {
                continue;
            }

            // Row extent of bright pixels inside this column run.
            let mut top = None;
            let mut bottom = 0usize;
            for y in 0..height {
                let row = &pixels[y * width..(y + 1) * width];
                if row[run_start..run_start + run_width]
                    .iter()
                    .any(|&p| p > BRIGHT_THRESHOLD)
                {
                    if top.is_none() {
                        top = Some(y);
                    }
                    bottom = y;
                }
            }
            if let Some(top) = top {
                faces.push(FaceBox::new(
                    run_start as u32,
                    top as u32,
                    run_width as u32,
                    (bottom - top + 1) as u32,
                ));
            }
        }

        Ok(faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_markers(markers: &[(u32, u32, u32, u32)]) -> Frame {
        let (width, height) = (320u32, 240u32);
        let mut data = vec![40u8; (width * height) as usize];
        for &(mx, my, mw, mh) in markers {
            for y in my..my + mh {
                for x in mx..mx + mw {
                    data[(y * width + x) as usize] = 230;
                }
            }
        }
        Frame::from_gray(data, width, height).unwrap()
    }

    #[test]
    fn finds_single_marker() {
        let frame = frame_with_markers(&[(100, 60, 40, 50)]);
        let mut backend = StubBackend::new();
        let faces = backend
            .detect(&frame, &DetectorParams::default())
            .unwrap();
        assert_eq!(faces, vec![FaceBox::new(100, 60, 40, 50)]);
    }

    #[test]
    fn finds_separated_markers() {
        let frame = frame_with_markers(&[(20, 60, 30, 30), (200, 100, 40, 40)]);
        let mut backend = StubBackend::new();
        let faces = backend
            .detect(&frame, &DetectorParams::default())
            .unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].x, 20);
        assert_eq!(faces[1].x, 200);
    }

    #[test]
    fn ignores_markers_narrower_than_min_neighbors() {
        let frame = frame_with_markers(&[(100, 60, 3, 30)]);
        let mut backend = StubBackend::new();
        let faces = backend
            .detect(&frame, &DetectorParams::default())
            .unwrap();
        assert!(faces.is_empty());
    }

    #[test]
    fn dark_frame_has_no_faces() {
        let frame = frame_with_markers(&[]);
        let mut backend = StubBackend::new();
        let faces = backend
            .detect(&frame, &DetectorParams::default())
            .unwrap();
        assert!(faces.is_empty());
    }
}
