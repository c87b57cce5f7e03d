use std::path::Path;

use crate::annotation::domain::annotated_frame::AnnotatedFrame;

/// Saves annotated frames to image files. The format follows the file
/// extension.
#[derive(Clone, Debug, Default)]
pub struct SnapshotWriter {
    size: Option<(u32, u32)>,
}

impl SnapshotWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize to `width` x `height` before saving.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn write(
        &self,
        path: &Path,
        frame: &AnnotatedFrame,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = frame
            .to_rgb_image()
            .ok_or("Failed to create image from frame data")?;

        let img = match self.size {
            Some((w, h)) => image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle),
            None => img,
        };

        img.save(path)?;
        log::debug!(
            "Saved snapshot of frame {} to {}",
            frame.index(),
            path.display()
        );
        Ok(())
    }
}
