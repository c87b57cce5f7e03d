/// Byte layout of a frame's pixel buffer.
///
/// All formats are packed, 8 bits per channel, row-major with no stride
/// padding. Capture adapters strip padding before constructing a `Frame`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }

    /// Buffer length in bytes for a `width` x `height` image.
    pub fn buffer_len(self, width: u32, height: u32) -> usize {
        (width as usize) * (height as usize) * self.bytes_per_pixel()
    }

    /// Converts a buffer in this format into packed RGB.
    ///
    /// Alpha is discarded. `Rgb8` input is copied unchanged.
    pub fn to_rgb8(self, data: &[u8]) -> Vec<u8> {
        let bpp = self.bytes_per_pixel();
        let pixels = data.len() / bpp;
        match self {
            PixelFormat::Rgb8 => data.to_vec(),
            PixelFormat::Gray8 => data.iter().flat_map(|&v| [v, v, v]).collect(),
            PixelFormat::Rgba8 => {
                let mut out = Vec::with_capacity(pixels * 3);
                for px in data.chunks_exact(bpp) {
                    out.extend_from_slice(&px[..3]);
                }
                out
            }
            PixelFormat::Bgr8 | PixelFormat::Bgra8 => {
                let mut out = Vec::with_capacity(pixels * 3);
                for px in data.chunks_exact(bpp) {
                    out.extend_from_slice(&[px[2], px[1], px[0]]);
                }
                out
            }
        }
    }
}
