// Frame - One rendered image handed from the renderer to the display layer
//
// A frame owns its pixel buffer. Ownership transfers on submission and the
// buffer exists only between submission and flip (or a capture copy).

/// Bytes per pixel (RGBA8 or BGRA8)
pub const BYTES_PER_PIXEL: usize = 4;

/// Error returned when a submitted buffer does not match its dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSizeMismatch {
    /// Expected buffer length (width × height × 4)
    pub expected: usize,
    /// Actual buffer length
    pub actual: usize,
}

impl std::fmt::Display for FrameSizeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "frame buffer size mismatch: expected {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for FrameSizeMismatch {}

/// One rendered frame
///
/// Pixels are tightly packed rows of 4-byte pixels, either RGBA or BGRA
/// depending on the `bgra` flag set by the producing renderer.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    bgra: bool,
}

impl Frame {
    /// Create a frame, validating that the buffer matches the dimensions
    pub fn new(data: Vec<u8>, width: u32, height: u32, bgra: bool) -> Result<Self, FrameSizeMismatch> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(FrameSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            bgra,
        })
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether pixel channels are ordered BGRA rather than RGBA
    pub fn is_bgra(&self) -> bool {
        self.bgra
    }

    /// Raw pixel data in the frame's native channel order
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame and return its pixel buffer
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Pixel data converted to RGBA channel order
    ///
    /// Returns a fresh buffer; the frame itself is not modified. Used by
    /// capture paths that feed encoders expecting RGBA.
    pub fn to_rgba(&self) -> Vec<u8> {
        if !self.bgra {
            return self.data.clone();
        }
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.swap(0, 2);
        }
        out
    }

    /// Generate a moving color-gradient test frame
    ///
    /// Used by the demo producer and tests; `tick` shifts the pattern so
    /// successive frames differ.
    pub fn test_pattern(width: u32, height: u32, tick: u64) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * BYTES_PER_PIXEL);
        for y in 0..height {
            for x in 0..width {
                data.push((x.wrapping_add(tick as u32) & 0xFF) as u8);
                data.push((y & 0xFF) as u8);
                data.push(((x ^ y) & 0xFF) as u8);
                data.push(0xFF);
            }
        }
        Self {
            data,
            width,
            height,
            bgra: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_validation() {
        let frame = Frame::new(vec![0; 16], 2, 2, false);
        assert!(frame.is_ok());

        let err = Frame::new(vec![0; 15], 2, 2, false).unwrap_err();
        assert_eq!(err.expected, 16);
        assert_eq!(err.actual, 15);
    }

    #[test]
    fn test_to_rgba_passthrough() {
        let frame = Frame::new(vec![1, 2, 3, 4], 1, 1, false).unwrap();
        assert_eq!(frame.to_rgba(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_to_rgba_swizzles_bgra() {
        let frame = Frame::new(vec![1, 2, 3, 4], 1, 1, true).unwrap();
        assert_eq!(frame.to_rgba(), vec![3, 2, 1, 4]);
        // Original data untouched
        assert_eq!(frame.data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_test_pattern_dimensions() {
        let frame = Frame::test_pattern(8, 4, 0);
        assert_eq!(frame.width(), 8);
        assert_eq!(frame.height(), 4);
        assert_eq!(frame.data().len(), 8 * 4 * BYTES_PER_PIXEL);
    }

    #[test]
    fn test_test_pattern_varies_with_tick() {
        let a = Frame::test_pattern(8, 8, 0);
        let b = Frame::test_pattern(8, 8, 1);
        assert_ne!(a.data(), b.data());
    }
}
