use std::time::Duration;

use image::RgbImage;

use crate::shared::bounding_box::PixelRect;
use crate::shared::frame::Frame;

/// A display-ready frame: the corrected RGB pixels with the overlay drawn,
/// plus the rectangles that were drawn onto it.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedFrame {
    frame: Frame,
    rects: Vec<PixelRect>,
}

impl AnnotatedFrame {
    pub fn new(frame: Frame, rects: Vec<PixelRect>) -> Self {
        Self { frame, rects }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn rects(&self) -> &[PixelRect] {
        &self.rects
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    /// Index of the captured frame this overlay was produced from.
    pub fn index(&self) -> u64 {
        self.frame.index()
    }

    pub fn timestamp(&self) -> Duration {
        self.frame.timestamp()
    }

    /// Copies the pixels into an `image` buffer, e.g. for saving.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(
            self.frame.width(),
            self.frame.height(),
            self.frame.format().to_rgb8(self.frame.data()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::pixel_format::PixelFormat;

    #[test]
    fn test_accessors_follow_source_frame() {
        let frame = Frame::new(
            vec![7u8; 2 * 3 * 3],
            2,
            3,
            PixelFormat::Rgb8,
            42,
            Duration::from_millis(1400),
        );
        let rect = PixelRect {
            x: 0,
            y: 1,
            width: 2,
            height: 1,
        };
        let annotated = AnnotatedFrame::new(frame, vec![rect]);

        assert_eq!(annotated.width(), 2);
        assert_eq!(annotated.height(), 3);
        assert_eq!(annotated.index(), 42);
        assert_eq!(annotated.timestamp(), Duration::from_millis(1400));
        assert_eq!(annotated.rects(), &[rect]);
    }

    #[test]
    fn test_to_rgb_image_copies_pixels() {
        let frame = Frame::new(
            vec![1, 2, 3, 4, 5, 6],
            2,
            1,
            PixelFormat::Rgb8,
            0,
            Duration::ZERO,
        );
        let image = AnnotatedFrame::new(frame, Vec::new()).to_rgb_image().unwrap();

        assert_eq!(image.dimensions(), (2, 1));
        assert_eq!(image.get_pixel(1, 0).0, [4, 5, 6]);
    }
}
