use std::sync::Arc;
use std::time::Instant;

use crate::annotation::domain::annotated_frame::AnnotatedFrame;
use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::config::{DetectionFailurePolicy, PipelineConfig};
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::pipeline_stats::PipelineStats;
use crate::preview::preview_sink::PreviewSink;
use crate::shared::frame::Frame;
use crate::shared::frame_error::FrameError;

/// Turns one captured frame into one published preview frame:
/// orient → detect → annotate → publish.
///
/// Owns the long-lived detector. Failures are confined to the frame that
/// caused them; the next call starts clean.
pub struct FramePipeline {
    detector: Box<dyn FaceDetector>,
    annotator: Box<dyn FrameAnnotator>,
    sink: Arc<PreviewSink>,
    config: PipelineConfig,
    logger: Box<dyn PipelineLogger>,
    stats: Arc<PipelineStats>,
}

impl FramePipeline {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        annotator: Box<dyn FrameAnnotator>,
        sink: Arc<PreviewSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            detector,
            annotator,
            sink,
            config,
            logger: Box::new(NullPipelineLogger),
            stats: Arc::new(PipelineStats::new()),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<PreviewSink> {
        &self.sink
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    pub fn logger_mut(&mut self) -> &mut dyn PipelineLogger {
        self.logger.as_mut()
    }

    /// Processes one frame synchronously and publishes the result.
    ///
    /// On error nothing is published and the sink keeps showing the
    /// previous frame.
    pub fn process(&mut self, frame: Frame) -> Result<Arc<AnnotatedFrame>, FrameError> {
        let index = frame.index();
        match self.run_stages(frame) {
            Ok(annotated) => {
                self.stats.record_published();
                self.logger.frame_published(index);
                Ok(annotated)
            }
            Err(e) => {
                log::debug!("Skipping frame: {e}");
                self.stats.record_failed();
                self.logger.frame_dropped(index, e.kind());
                Err(e)
            }
        }
    }

    fn run_stages(&mut self, frame: Frame) -> Result<Arc<AnnotatedFrame>, FrameError> {
        let t0 = Instant::now();
        let oriented = self.config.rotation.correct(&frame)?;
        drop(frame);
        let t1 = Instant::now();
        self.logger.timing("orient", ms(t0, t1));

        let detections = self.detect(&oriented)?;
        let t2 = Instant::now();
        self.logger.timing("detect", ms(t1, t2));
        self.logger.metric("faces", detections.len() as f64);

        let annotated = Arc::new(self.annotator.annotate(&oriented, &detections)?);
        let t3 = Instant::now();
        self.logger.timing("annotate", ms(t2, t3));

        self.sink.publish(annotated.clone());
        self.logger.timing("publish", ms(t3, Instant::now()));

        Ok(annotated)
    }

    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, FrameError> {
        let index = frame.index();
        match self.detector.detect(frame) {
            Ok(boxes) => Ok(DetectionResult::new(index, boxes)),
            Err(e) => {
                self.stats.record_detection_error();
                match self.config.on_detection_failure {
                    DetectionFailurePolicy::TreatAsEmpty => {
                        log::warn!("Detection failed on frame {index}, showing it unannotated: {e}");
                        Ok(DetectionResult::empty(index))
                    }
                    DetectionFailurePolicy::DropFrame => Err(FrameError::Detection {
                        index,
                        reason: e.to_string(),
                    }),
                }
            }
        }
    }
}

fn ms(start: Instant, end: Instant) -> f64 {
    end.duration_since(start).as_secs_f64() * 1000.0
}
