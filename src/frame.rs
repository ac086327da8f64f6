//! Captured frame container.
//!
//! A `Frame` is one grayscale image captured from the camera. It is owned by
//! the loop iteration that captured it and dropped at the end of the cycle;
//! nothing in the kernel retains frames across iterations.
//!
//! Sources convert to 8-bit grayscale at the capture boundary, so detection
//! backends only ever see one pixel format.

use anyhow::{anyhow, Result};

/// One captured frame: an 8-bit grayscale pixel grid in row-major order.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap an existing grayscale buffer. The buffer length must match the
    /// dimensions exactly.
    pub fn from_gray(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "grayscale frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Convert a packed RGB24 buffer to grayscale (BT.601 luma).
    pub fn from_rgb(rgb: &[u8], width: u32, height: u32) -> Result<Self> {
        let pixel_count = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        let expected = pixel_count
            .checked_mul(3)
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if rgb.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                rgb.len()
            ));
        }

        let mut data = vec![0u8; pixel_count];
        for (i, gray) in data.iter_mut().enumerate() {
            let r = rgb[i * 3] as f32;
            let g = rgb[i * 3 + 1] as f32;
            let b = rgb[i * 3 + 2] as f32;
            *gray = (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8;
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Grayscale pixel data, row-major, one byte per pixel.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Horizontal center of the frame in pixel units.
    pub fn center_x(&self) -> u32 {
        self.width / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_gray_validates_length() {
        assert!(Frame::from_gray(vec![0u8; 12], 4, 3).is_ok());
        assert!(Frame::from_gray(vec![0u8; 11], 4, 3).is_err());
    }

    #[test]
    fn from_rgb_converts_luma() {
        // One white pixel, one black pixel.
        let rgb = vec![255, 255, 255, 0, 0, 0];
        let frame = Frame::from_rgb(&rgb, 2, 1).unwrap();
        assert_eq!(frame.pixels(), &[255, 0]);
    }

    #[test]
    fn from_rgb_rejects_short_buffer() {
        assert!(Frame::from_rgb(&[0u8; 5], 2, 1).is_err());
    }

    #[test]
    fn center_x_is_half_width() {
        let frame = Frame::from_gray(vec![0u8; 640 * 480], 640, 480).unwrap();
        assert_eq!(frame.center_x(), 320);
    }
}
