use thiserror::Error;

/// Failure scoped to a single frame.
///
/// None of these are fatal: the pipeline drops (or, for detection, may
/// blank-annotate) the affected frame and carries on with the next one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame {index} could not be decoded: {reason}")]
    CaptureDecode { index: u64, reason: String },
    #[error("detection failed on frame {index}: {reason}")]
    Detection { index: u64, reason: String },
    #[error("frame {index} could not be rendered: {reason}")]
    Rendering { index: u64, reason: String },
}

impl FrameError {
    /// Short label used for logging and drop statistics.
    pub fn kind(&self) -> &'static str {
        match self {
            FrameError::CaptureDecode { .. } => "capture_decode",
            FrameError::Detection { .. } => "detection",
            FrameError::Rendering { .. } => "rendering",
        }
    }

    pub fn index(&self) -> u64 {
        match self {
            FrameError::CaptureDecode { index, .. }
            | FrameError::Detection { index, .. }
            | FrameError::Rendering { index, .. } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_index() {
        let err = FrameError::Rendering {
            index: 7,
            reason: "no surface".into(),
        };
        assert_eq!(err.kind(), "rendering");
        assert_eq!(err.index(), 7);
    }

    #[test]
    fn test_display_includes_reason() {
        let err = FrameError::Detection {
            index: 3,
            reason: "session closed".into(),
        };
        assert_eq!(
            err.to_string(),
            "detection failed on frame 3: session closed"
        );
    }
}
