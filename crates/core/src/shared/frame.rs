use std::time::Duration;

use ndarray::ArrayView3;

use super::frame_error::FrameError;
use super::pixel_format::PixelFormat;

/// A single captured camera frame: packed pixels in row-major order.
///
/// Immutable once captured. Orientation correction and annotation always
/// produce a new `Frame` rather than touching this one.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    index: u64,
    timestamp: Duration,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        index: u64,
        timestamp: Duration,
    ) -> Self {
        debug_assert_eq!(
            data.len(),
            format.buffer_len(width, height),
            "data length must equal width * height * bytes per pixel"
        );
        Self {
            data,
            width,
            height,
            format,
            index,
            timestamp,
        }
    }

    /// Validating constructor for buffers coming from a capture device.
    pub fn try_new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        index: u64,
        timestamp: Duration,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::CaptureDecode {
                index,
                reason: format!("empty frame {width}x{height}"),
            });
        }
        let expected = format.buffer_len(width, height);
        if data.len() != expected {
            return Err(FrameError::CaptureDecode {
                index,
                reason: format!(
                    "buffer is {} bytes, expected {expected} for {width}x{height} {format:?}",
                    data.len()
                ),
            });
        }
        Ok(Self::new(data, width, height, format, index, timestamp))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Capture sequence number assigned by the source.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Monotonic capture time relative to the start of the source session.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.format.bytes_per_pixel(),
        )
    }
}
