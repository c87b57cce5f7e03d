use image::{Rgb, RgbImage};

use crate::annotation::domain::annotated_frame::AnnotatedFrame;
use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::detection_result::DetectionResult;
use crate::shared::bounding_box::PixelRect;
use crate::shared::constants::{DEFAULT_STROKE_COLOR, DEFAULT_STROKE_WIDTH};
use crate::shared::frame::Frame;
use crate::shared::frame_error::FrameError;
use crate::shared::pixel_format::PixelFormat;

/// Outlines each detected face with a solid rectangle.
///
/// The stroke is drawn inward from the rectangle edge, so an outline never
/// covers pixels outside the face box.
#[derive(Clone, Debug)]
pub struct BoxAnnotator {
    color: Rgb<u8>,
    stroke_width: u32,
}

impl BoxAnnotator {
    pub fn new(color: [u8; 3], stroke_width: u32) -> Self {
        Self {
            color: Rgb(color),
            stroke_width: stroke_width.max(1),
        }
    }
}

impl Default for BoxAnnotator {
    fn default() -> Self {
        Self::new(DEFAULT_STROKE_COLOR, DEFAULT_STROKE_WIDTH)
    }
}

impl FrameAnnotator for BoxAnnotator {
    fn annotate(
        &self,
        frame: &Frame,
        detections: &DetectionResult,
    ) -> Result<AnnotatedFrame, FrameError> {
        if detections.is_empty() {
            return Ok(AnnotatedFrame::new(frame.clone(), Vec::new()));
        }

        if frame.format() != PixelFormat::Rgb8 {
            return Err(FrameError::Rendering {
                index: frame.index(),
                reason: format!("cannot draw on {:?} pixels", frame.format()),
            });
        }

        let mut surface = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or_else(|| FrameError::Rendering {
                index: frame.index(),
                reason: "pixel buffer does not match frame dimensions".into(),
            })?;

        let rects: Vec<PixelRect> = detections
            .boxes()
            .iter()
            .filter_map(|b| b.to_pixel_rect(frame.width(), frame.height()))
            .collect();

        for rect in &rects {
            draw_outline(&mut surface, rect, self.color, self.stroke_width);
        }

        let (width, height) = surface.dimensions();
        let annotated = Frame::new(
            surface.into_raw(),
            width,
            height,
            PixelFormat::Rgb8,
            frame.index(),
            frame.timestamp(),
        );
        Ok(AnnotatedFrame::new(annotated, rects))
    }
}

/// Draws `stroke` concentric one-pixel rings inside `rect`.
fn draw_outline(surface: &mut RgbImage, rect: &PixelRect, color: Rgb<u8>, stroke: u32) {
    let (w, h) = surface.dimensions();
    let right = rect.right().min(w);
    let bottom = rect.bottom().min(h);
    if right <= rect.x || bottom <= rect.y {
        return;
    }

    for t in 0..stroke {
        let x0 = rect.x + t;
        let y0 = rect.y + t;
        // Inclusive far edges of this ring.
        let (Some(x1), Some(y1)) = (right.checked_sub(1 + t), bottom.checked_sub(1 + t)) else {
            break;
        };
        if x0 > x1 || y0 > y1 {
            break;
        }
        for x in x0..=x1 {
            surface.put_pixel(x, y0, color);
            surface.put_pixel(x, y1, color);
        }
        for y in y0..=y1 {
            surface.put_pixel(x0, y, color);
            surface.put_pixel(x1, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;
    use rstest::rstest;
    use std::time::Duration;

    const GREEN: [u8; 3] = [0, 255, 0];

    fn gray_frame(width: u32, height: u32) -> Frame {
        Frame::new(
            vec![128u8; (width * height * 3) as usize],
            width,
            height,
            PixelFormat::Rgb8,
            3,
            Duration::from_millis(100),
        )
    }

    fn pixel(annotated: &AnnotatedFrame, x: u32, y: u32) -> [u8; 3] {
        annotated.to_rgb_image().unwrap().get_pixel(x, y).0
    }

    fn detections(boxes: Vec<BoundingBox>) -> DetectionResult {
        DetectionResult::new(3, boxes)
    }

    #[test]
    fn test_empty_detections_leave_pixels_unchanged() {
        let frame = gray_frame(20, 10);
        let annotated = BoxAnnotator::default()
            .annotate(&frame, &DetectionResult::empty(3))
            .unwrap();

        assert_eq!(annotated.frame(), &frame);
        assert!(annotated.rects().is_empty());
    }

    #[test]
    fn test_empty_detections_accept_any_pixel_format() {
        let frame = Frame::new(
            vec![9u8; 4 * 2 * 4],
            4,
            2,
            PixelFormat::Bgra8,
            0,
            Duration::ZERO,
        );
        let annotated = BoxAnnotator::default()
            .annotate(&frame, &DetectionResult::empty(0))
            .unwrap();
        assert_eq!(annotated.frame().data(), frame.data());
    }

    #[test]
    fn test_box_is_drawn_from_bottom_left_origin() {
        let frame = gray_frame(200, 100);
        let annotated = BoxAnnotator::new(GREEN, 1)
            .annotate(
                &frame,
                &detections(vec![BoundingBox::new(0.25, 0.25, 0.1, 0.1)]),
            )
            .unwrap();

        assert_eq!(
            annotated.rects(),
            &[PixelRect {
                x: 50,
                y: 65,
                width: 20,
                height: 10
            }]
        );
        assert_eq!(pixel(&annotated, 50, 65), GREEN);
        assert_eq!(pixel(&annotated, 69, 74), GREEN);
        // Unflipped placement would start at row 25.
        assert_eq!(pixel(&annotated, 50, 25), [128, 128, 128]);
    }

    #[test]
    fn test_interior_is_untouched() {
        let frame = gray_frame(200, 100);
        let annotated = BoxAnnotator::new(GREEN, 3)
            .annotate(
                &frame,
                &detections(vec![BoundingBox::new(0.25, 0.25, 0.1, 0.1)]),
            )
            .unwrap();

        assert_eq!(pixel(&annotated, 60, 70), [128, 128, 128]);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(5)]
    fn test_stroke_width_is_drawn_inward(#[case] stroke: u32) {
        let frame = gray_frame(100, 100);
        // Rect covers pixels 20..60 on both axes.
        let annotated = BoxAnnotator::new(GREEN, stroke)
            .annotate(&frame, &detections(vec![BoundingBox::new(0.2, 0.4, 0.4, 0.4)]))
            .unwrap();

        for t in 0..stroke {
            assert_eq!(pixel(&annotated, 20 + t, 40), GREEN, "left ring {t}");
            assert_eq!(pixel(&annotated, 59 - t, 40), GREEN, "right ring {t}");
        }
        assert_eq!(pixel(&annotated, 20 + stroke, 40), [128, 128, 128]);
        assert_eq!(pixel(&annotated, 19, 40), [128, 128, 128]);
        assert_eq!(pixel(&annotated, 60, 40), [128, 128, 128]);
    }

    #[rstest]
    #[case(BoundingBox::new(0.0, 0.0, 1.0, 1.0))]
    #[case(BoundingBox::new(0.9, 0.9, 0.1, 0.1))]
    #[case(BoundingBox::new(0.0, 0.95, 0.05, 0.05))]
    #[case(BoundingBox::new(0.999, 0.0, 0.001, 0.5))]
    fn test_in_bounds_boxes_never_leave_the_frame(#[case] bbox: BoundingBox) {
        let frame = gray_frame(37, 23);
        let annotated = BoxAnnotator::new(GREEN, 4)
            .annotate(&frame, &detections(vec![bbox]))
            .unwrap();

        assert_eq!(annotated.width(), 37);
        assert_eq!(annotated.height(), 23);
        for rect in annotated.rects() {
            assert!(rect.right() <= 37);
            assert!(rect.bottom() <= 23);
        }
    }

    #[test]
    fn test_full_frame_box_outlines_the_border() {
        let frame = gray_frame(10, 10);
        let annotated = BoxAnnotator::new(GREEN, 1)
            .annotate(&frame, &detections(vec![BoundingBox::new(0.0, 0.0, 1.0, 1.0)]))
            .unwrap();

        assert_eq!(pixel(&annotated, 0, 0), GREEN);
        assert_eq!(pixel(&annotated, 9, 9), GREEN);
        assert_eq!(pixel(&annotated, 5, 5), [128, 128, 128]);
    }

    #[test]
    fn test_degenerate_box_is_skipped() {
        let frame = gray_frame(50, 50);
        let annotated = BoxAnnotator::default()
            .annotate(&frame, &detections(vec![BoundingBox::new(0.5, 0.5, 0.0, 0.2)]))
            .unwrap();

        assert!(annotated.rects().is_empty());
        assert_eq!(annotated.frame().data(), frame.data());
    }

    #[test]
    fn test_input_frame_is_not_mutated() {
        let frame = gray_frame(40, 40);
        let before = frame.clone();
        let _ = BoxAnnotator::default()
            .annotate(&frame, &detections(vec![BoundingBox::new(0.1, 0.1, 0.5, 0.5)]))
            .unwrap();

        assert_eq!(frame, before);
    }

    #[test]
    fn test_output_keeps_index_and_timestamp() {
        let frame = gray_frame(40, 40);
        let annotated = BoxAnnotator::default()
            .annotate(&frame, &detections(vec![BoundingBox::new(0.1, 0.1, 0.5, 0.5)]))
            .unwrap();

        assert_eq!(annotated.index(), 3);
        assert_eq!(annotated.timestamp(), Duration::from_millis(100));
    }

    #[test]
    fn test_non_rgb_input_is_a_rendering_error() {
        let frame = Frame::new(vec![0u8; 16], 4, 4, PixelFormat::Gray8, 8, Duration::ZERO);
        let err = BoxAnnotator::default()
            .annotate(&frame, &DetectionResult::new(8, vec![BoundingBox::new(0.0, 0.0, 0.5, 0.5)]))
            .unwrap_err();

        assert!(matches!(err, FrameError::Rendering { index: 8, .. }));
    }

    #[test]
    fn test_zero_stroke_width_is_raised_to_one() {
        let frame = gray_frame(10, 10);
        let annotated = BoxAnnotator::new(GREEN, 0)
            .annotate(&frame, &detections(vec![BoundingBox::new(0.0, 0.0, 1.0, 1.0)]))
            .unwrap();
        assert_eq!(pixel(&annotated, 0, 0), GREEN);
    }
}
