/// Axis-aligned face rectangle in normalized image coordinates.
///
/// Uses the vision-API convention: origin at the bottom-left corner, y
/// growing upward, all components relative to the image extent. `(x, y)`
/// is therefore the bottom-left corner of the box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer rectangle on a top-left-origin drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a normalized box from top-left-origin pixel corners
    /// `(x1, y1)`-`(x2, y2)`, flipping into the bottom-left convention.
    pub fn from_pixel_corners(
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let fw = frame_width as f64;
        let fh = frame_height as f64;
        let x1 = x1.clamp(0.0, fw);
        let x2 = x2.clamp(0.0, fw);
        let y1 = y1.clamp(0.0, fh);
        let y2 = y2.clamp(0.0, fh);
        Self {
            x: x1.min(x2) / fw,
            y: (fh - y1.max(y2)) / fh,
            width: (x2 - x1).abs() / fw,
            height: (y2 - y1).abs() / fh,
        }
    }

    /// Maps the box onto a `frame_width` x `frame_height` top-left-origin
    /// surface.
    ///
    /// The vertical axis is flipped: `top = H - y*H - h*H`. Edges are
    /// rounded to the nearest pixel and clamped to the surface, so the
    /// result never leaves `[0, W] x [0, H]`. Returns `None` when nothing
    /// of the box remains visible.
    pub fn to_pixel_rect(&self, frame_width: u32, frame_height: u32) -> Option<PixelRect> {
        let fw = frame_width as f64;
        let fh = frame_height as f64;

        let left = (self.x * fw).round().clamp(0.0, fw);
        let right = ((self.x + self.width) * fw).round().clamp(0.0, fw);
        let top = (fh - self.y * fh - self.height * fh).round().clamp(0.0, fh);
        let bottom = (fh - self.y * fh).round().clamp(0.0, fh);

        if right <= left || bottom <= top {
            return None;
        }

        Some(PixelRect {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }
}
