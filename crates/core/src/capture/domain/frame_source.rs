use thiserror::Error;

use crate::shared::frame::Frame;

/// Receives every captured frame, in capture order, one call at a time.
pub type FrameCallback = Box<dyn FnMut(Frame) + Send>;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture session is already running")]
    AlreadyRunning,
    #[error("failed to start capture: {0}")]
    Start(String),
}

/// A live stream of frames, typically a camera.
///
/// Implementations invoke the callback on their own execution context,
/// never concurrently, and skip frames they cannot decode instead of
/// reporting them. The device session belongs to the source; callers only
/// control whether delivery is running.
pub trait FrameSource: Send {
    /// Begins delivering frames to `on_frame`.
    fn start(&mut self, on_frame: FrameCallback) -> Result<(), CaptureError>;

    /// Halts delivery. Once this returns the callback has been dropped and
    /// will not be invoked again. Calling it on a stopped source is a no-op.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}
