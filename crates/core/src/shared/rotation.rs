use image::imageops;
use image::RgbImage;

use super::frame::Frame;
use super::frame_error::FrameError;
use super::pixel_format::PixelFormat;

/// Clockwise rotation applied to raw sensor frames before detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    None,
    #[default]
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Maps a multiple of 90 degrees (any sign) to a rotation.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Cw90),
            180 => Some(Rotation::Cw180),
            270 => Some(Rotation::Cw270),
            _ => None,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// Produces the display-oriented RGB frame for a raw capture.
    ///
    /// The result keeps the source index and timestamp; pixels are always
    /// packed `Rgb8` so detection and drawing share one buffer layout.
    pub fn correct(self, frame: &Frame) -> Result<Frame, FrameError> {
        let rgb = frame.format().to_rgb8(frame.data());
        let image = RgbImage::from_raw(frame.width(), frame.height(), rgb).ok_or_else(|| {
            FrameError::CaptureDecode {
                index: frame.index(),
                reason: "pixel buffer does not match frame dimensions".into(),
            }
        })?;

        let rotated = match self {
            Rotation::None => image,
            Rotation::Cw90 => imageops::rotate90(&image),
            Rotation::Cw180 => imageops::rotate180(&image),
            Rotation::Cw270 => imageops::rotate270(&image),
        };

        let (width, height) = rotated.dimensions();
        Ok(Frame::new(
            rotated.into_raw(),
            width,
            height,
            PixelFormat::Rgb8,
            frame.index(),
            frame.timestamp(),
        ))
    }
}
