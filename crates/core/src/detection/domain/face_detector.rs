use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// One long-lived instance serves every frame of every capture session,
/// hence `&mut self`. The result for a frame must depend only on that
/// frame's pixels: implementations may cache buffers or sessions but
/// never carry detections from one call into the next.
///
/// Boxes are normalized with a bottom-left origin (see [`BoundingBox`]).
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
