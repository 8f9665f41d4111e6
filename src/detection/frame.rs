//! Video frames handed from the camera stream to the detector.

use ndarray::{Array3, ArrayView3};

/// A decoded video frame in height x width x channel layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: Array3<u8>,
}

impl Frame {
    /// Wrap an interleaved pixel buffer of shape `(height, width, channels)`.
    pub fn new(pixels: Array3<u8>) -> Self {
        Self { pixels }
    }

    /// Build a frame from a flat interleaved buffer.
    ///
    /// Returns `None` when `data.len()` does not equal
    /// `width * height * channels`.
    pub fn from_raw(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Option<Self> {
        let shape = (height as usize, width as usize, channels as usize);
        Array3::from_shape_vec(shape, data).ok().map(Self::new)
    }

    /// A frame with every sample set to zero.
    pub fn blank(width: u32, height: u32, channels: u32) -> Self {
        Self::new(Array3::zeros((
            height as usize,
            width as usize,
            channels as usize,
        )))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.dim().1 as u32
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.dim().0 as u32
    }

    #[inline]
    pub fn channels(&self) -> u32 {
        self.pixels.dim().2 as u32
    }

    /// Intrinsic resolution as `(width, height)`.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn pixels(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_shape() {
        let frame = Frame::from_raw(4, 2, 3, vec![7; 24]).unwrap();
        assert_eq!(frame.resolution(), (4, 2));
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.pixels()[[1, 3, 2]], 7);
    }

    #[test]
    fn test_from_raw_rejects_bad_length() {
        assert!(Frame::from_raw(4, 2, 3, vec![0; 23]).is_none());
    }
}
