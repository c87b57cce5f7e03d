use crate::shared::rotation::Rotation;

/// What happens to a frame delivered while detection is still busy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Detect on the source's delivery thread. Delivery slows to the
    /// detector's pace and the source discards stale frames itself.
    Inline,
    /// Detect on a worker. A frame arriving while the worker is busy waits
    /// in a single slot, replacing whatever was waiting there.
    #[default]
    ReplaceWaiting,
    /// Detect on a worker. A frame arriving while another one is already
    /// waiting is dropped.
    DropIncoming,
}

/// What to do with a frame whose detection call failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectionFailurePolicy {
    /// Show the frame without overlays.
    #[default]
    TreatAsEmpty,
    /// Skip the frame; the display keeps the previous one.
    DropFrame,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Applied to every captured frame before detection and drawing.
    pub rotation: Rotation,
    pub backpressure: BackpressurePolicy,
    pub on_detection_failure: DetectionFailurePolicy,
}
