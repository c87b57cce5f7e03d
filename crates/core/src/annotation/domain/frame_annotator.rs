use crate::annotation::domain::annotated_frame::AnnotatedFrame;
use crate::detection::domain::detection_result::DetectionResult;
use crate::shared::frame::Frame;
use crate::shared::frame_error::FrameError;

/// Produces the display frame for one orientation-corrected frame and the
/// detections found on it.
///
/// Implementations must not mutate `frame` and must draw either every box
/// or none of them.
pub trait FrameAnnotator: Send {
    fn annotate(
        &self,
        frame: &Frame,
        detections: &DetectionResult,
    ) -> Result<AnnotatedFrame, FrameError>;
}
