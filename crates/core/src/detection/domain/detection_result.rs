use crate::shared::bounding_box::BoundingBox;

/// Faces found in one frame, in detector order.
///
/// An empty result means detection ran and found nothing. "Not yet
/// detected" is expressed as `Option<DetectionResult>::None` by callers.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionResult {
    frame_index: u64,
    boxes: Vec<BoundingBox>,
}

impl DetectionResult {
    pub fn new(frame_index: u64, boxes: Vec<BoundingBox>) -> Self {
        Self { frame_index, boxes }
    }

    pub fn empty(frame_index: u64) -> Self {
        Self::new(frame_index, Vec::new())
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}
