//! YOLO face detector using ONNX Runtime via `ort`.
//!
//! Letterbox preprocessing, inference, confidence filtering and NMS. Boxes
//! leave this module normalized with a bottom-left origin, the convention
//! the rest of the pipeline expects from a detector.
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::pixel_format::PixelFormat;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox padding value (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

/// YOLO face detector backed by an ONNX Runtime session.
///
/// Stateless between frames: the session and input size are reused, the
/// detections are not.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    // [N, C, H, W]; square input, so H is enough
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded face model {} (input {input_size}px, confidence {confidence})",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        if frame.format() != PixelFormat::Rgb8 {
            return Err(format!("expected an RGB frame, got {:?}", frame.format()).into());
        }

        let letterboxed = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(letterboxed.tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape();

        // [1, features, detections] (transposed export) or [1, detections, features].
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_feats < 5 {
            return Err(format!("YOLO output has {num_feats} features, need at least 5").into());
        }

        let data = tensor.as_standard_layout();
        let data = data.as_slice().ok_or("Cannot get tensor slice")?;
        let feature = |det: usize, feat: usize| -> f64 {
            if transposed {
                data[feat * num_dets + det] as f64
            } else {
                data[det * num_feats + feat] as f64
            }
        };

        let mut candidates = Vec::new();
        for i in 0..num_dets {
            let conf = feature(i, 4);
            if conf < self.confidence {
                continue;
            }
            let (cx, cy, w, h) = (feature(i, 0), feature(i, 1), feature(i, 2), feature(i, 3));
            candidates.push(Candidate {
                corners: letterboxed.unmap([cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]),
                confidence: conf,
            });
        }

        let kept = nms(candidates, NMS_IOU_THRESH);

        Ok(kept
            .iter()
            .map(|c| {
                let [x1, y1, x2, y2] = c.corners;
                BoundingBox::from_pixel_corners(x1, y1, x2, y2, frame.width(), frame.height())
            })
            .filter(|b| b.width > 0.0 && b.height > 0.0)
            .collect())
    }
}

/// Preferred ONNX execution providers for the current platform.
///
/// An empty list leaves ort on its default CPU provider.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

struct Letterboxed {
    tensor: ndarray::Array4<f32>,
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterboxed {
    /// Maps `[x1, y1, x2, y2]` from model input space back to frame pixels.
    fn unmap(&self, corners: [f64; 4]) -> [f64; 4] {
        let px = self.pad_x as f64;
        let py = self.pad_y as f64;
        [
            (corners[0] - px) / self.scale,
            (corners[1] - py) / self.scale,
            (corners[2] - px) / self.scale,
            (corners[3] - py) / self.scale,
        ]
    }
}

/// Letterbox-resize an RGB frame into a `target_size` square NCHW tensor.
fn letterbox(frame: &Frame, target_size: u32) -> Letterboxed {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let mut tensor = ndarray::Array4::<f32>::from_elem(
        (1, 3, target_size as usize, target_size as usize),
        PAD_VALUE,
    );

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize into the padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    Letterboxed {
        tensor,
        scale,
        pad_x,
        pad_y,
    }
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Candidate {
    /// Top-left-origin pixel corners `[x1, y1, x2, y2]`.
    corners: [f64; 4],
    confidence: f64,
}

/// Greedy NMS. Output is sorted by descending confidence.
fn nms(mut candidates: Vec<Candidate>, iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if keep
            .iter()
            .all(|k| bbox_iou(&k.corners, &candidate.corners) <= iou_thresh)
        {
            keep.push(candidate);
        }
    }
    keep
}

/// IoU between two boxes represented as `[x1, y1, x2, y2]`.
fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    fn rgb_frame(width: u32, height: u32, value: u8) -> Frame {
        let data = vec![value; (width * height * 3) as usize];
        Frame::new(data, width, height, PixelFormat::Rgb8, 0, Duration::ZERO)
    }

    fn candidate(corners: [f64; 4], confidence: f64) -> Candidate {
        Candidate {
            corners,
            confidence,
        }
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → 640: scale 3.2, 640x320 image, 160px bands top and bottom
        let lb = letterbox(&rgb_frame(200, 100, 128), 640);

        assert_eq!(lb.tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(lb.scale, 3.2, epsilon = 1e-9);
        assert_eq!(lb.pad_x, 0);
        assert_eq!(lb.pad_y, 160);
    }

    #[test]
    fn test_letterbox_portrait_frame_pads_horizontally() {
        // Orientation-corrected frames are usually portrait.
        let lb = letterbox(&rgb_frame(90, 160, 128), 640);

        assert_relative_eq!(lb.scale, 4.0, epsilon = 1e-9);
        assert_eq!(lb.pad_y, 0);
        assert_eq!(lb.pad_x, 140);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let lb = letterbox(&rgb_frame(100, 50, 255), 640);

        let y = lb.pad_y as usize + 1;
        let x = lb.pad_x as usize + 1;
        assert_relative_eq!(lb.tensor[[0, 0, y, x]], 1.0, epsilon = 0.01);
        assert_relative_eq!(lb.tensor[[0, 0, 0, 0]], PAD_VALUE, epsilon = 0.01);
    }

    #[test]
    fn test_unmap_inverts_letterbox() {
        let lb = letterbox(&rgb_frame(200, 100, 0), 640);
        // Frame pixel (50, 25) sits at (160, 240) in model space.
        let [x1, y1, x2, y2] = lb.unmap([160.0, 240.0, 224.0, 272.0]);
        assert_relative_eq!(x1, 50.0, epsilon = 1e-9);
        assert_relative_eq!(y1, 25.0, epsilon = 1e-9);
        assert_relative_eq!(x2, 70.0, epsilon = 1e-9);
        assert_relative_eq!(y2, 35.0, epsilon = 1e-9);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let kept = nms(
            vec![
                candidate([0.0, 0.0, 100.0, 100.0], 0.9),
                candidate([5.0, 5.0, 105.0, 105.0], 0.8),
            ],
            0.3,
        );
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_keeps_non_overlapping_in_confidence_order() {
        let kept = nms(
            vec![
                candidate([0.0, 0.0, 50.0, 50.0], 0.6),
                candidate([200.0, 200.0, 250.0, 250.0], 0.8),
            ],
            0.3,
        );
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].confidence, 0.8);
        assert_relative_eq!(kept[1].confidence, 0.6);
    }

    #[test]
    fn test_nms_higher_confidence_wins() {
        let kept = nms(
            vec![
                candidate([0.0, 0.0, 100.0, 100.0], 0.5),
                candidate([2.0, 2.0, 102.0, 102.0], 0.9),
            ],
            0.3,
        );
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_empty_input() {
        assert!(nms(Vec::new(), 0.3).is_empty());
    }

    #[test]
    fn test_bbox_iou() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert_eq!(bbox_iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        assert_relative_eq!(bbox_iou(&a, &a), 1.0);
        assert_relative_eq!(bbox_iou(&a, &[5.0, 5.0, 15.0, 15.0]), 25.0 / 175.0);
    }
}
