use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::capture::domain::frame_source::{CaptureError, FrameCallback, FrameSource};
use crate::pipeline::config::BackpressurePolicy;
use crate::pipeline::frame_mailbox::{FrameMailbox, Offer};
use crate::pipeline::frame_pipeline::FramePipeline;
use crate::pipeline::pipeline_stats::{PipelineStats, StatsSnapshot};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("pipeline session is already running")]
    AlreadyRunning,
    #[error("frame source failed to start: {0}")]
    Source(#[from] CaptureError),
    #[error("failed to spawn detection worker: {0}")]
    Spawn(#[source] std::io::Error),
}

struct Session {
    mailbox: Option<Arc<FrameMailbox>>,
    worker: Option<JoinHandle<()>>,
    dropped_at_start: u64,
}

/// Runs a [`FramePipeline`] against a live [`FrameSource`].
///
/// Layout depends on the back-pressure policy:
/// - `Inline`: `source thread [orient/detect/annotate/publish]`
/// - otherwise: `source thread → mailbox → worker [orient/detect/annotate/publish]`
///
/// The pipeline (and with it the detector) outlives sessions, so a
/// stopped pipeline can be started again without reloading the model.
pub struct LivePipeline {
    pipeline: Arc<Mutex<FramePipeline>>,
    source: Box<dyn FrameSource>,
    backpressure: BackpressurePolicy,
    stats: Arc<PipelineStats>,
    session: Option<Session>,
}

impl LivePipeline {
    /// The back-pressure policy is taken from the pipeline's config.
    pub fn new(pipeline: FramePipeline, source: Box<dyn FrameSource>) -> Self {
        let backpressure = pipeline.config().backpressure;
        let stats = pipeline.stats().clone();
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
            source,
            backpressure,
            stats,
            session: None,
        }
    }

    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.session.is_some() {
            return Err(PipelineError::AlreadyRunning);
        }

        let mut session = match self.backpressure {
            BackpressurePolicy::Inline => Session {
                mailbox: None,
                worker: None,
                dropped_at_start: 0,
            },
            BackpressurePolicy::ReplaceWaiting => self.spawn_worker(FrameMailbox::replacing())?,
            BackpressurePolicy::DropIncoming => self.spawn_worker(FrameMailbox::rejecting())?,
        };
        session.dropped_at_start = self.stats.snapshot().dropped;

        let on_frame = match &session.mailbox {
            Some(mailbox) => offer_callback(mailbox.clone(), self.stats.clone()),
            None => inline_callback(self.pipeline.clone(), self.stats.clone()),
        };

        if let Err(e) = self.source.start(on_frame) {
            discard_waiting(&session, &self.stats);
            join_worker(&mut session);
            return Err(e.into());
        }

        log::info!("Live pipeline started ({:?})", self.backpressure);
        self.session = Some(session);
        Ok(())
    }

    /// Stops delivery, lets the in-flight frame finish and joins the worker.
    /// No-op when not running.
    ///
    /// A waiting frame is discarded, unless the source already ended on its
    /// own (end of a non-looping input): then it is still processed, so the
    /// last captured frame reaches the preview.
    pub fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let source_ended = !self.source.is_running();
        self.source.stop();
        let skipped = self.stats.snapshot().dropped - session.dropped_at_start;

        let discarded = if source_ended {
            if let Some(mailbox) = &session.mailbox {
                mailbox.finish();
            }
            None
        } else {
            discard_waiting(&session, &self.stats)
        };
        join_worker(&mut session);

        {
            let mut pipeline = lock(&self.pipeline);
            let logger = pipeline.logger_mut();
            logger.frames_skipped(skipped, "backpressure");
            if let Some(index) = discarded {
                logger.frame_dropped(index, "stopped");
            }
        }

        let stats = self.stats.snapshot();
        log::info!(
            "Live pipeline stopped: {} captured, {} published, {} dropped, {} failed",
            stats.captured,
            stats.published,
            stats.dropped,
            stats.failed
        );
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// False once the source has ended on its own, e.g. at the end of a
    /// non-looping file.
    pub fn is_source_running(&self) -> bool {
        self.source.is_running()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Emits the pipeline logger's summary.
    pub fn log_summary(&self) {
        lock(&self.pipeline).logger().summary();
    }

    fn spawn_worker(&self, mailbox: FrameMailbox) -> Result<Session, PipelineError> {
        let mailbox = Arc::new(mailbox);
        let worker_mailbox = mailbox.clone();
        let pipeline = self.pipeline.clone();

        let worker = thread::Builder::new()
            .name("facecam-detect".into())
            .spawn(move || {
                while let Some(frame) = worker_mailbox.take() {
                    // Errors are already counted and logged by the pipeline.
                    let _ = lock(&pipeline).process(frame);
                }
            })
            .map_err(PipelineError::Spawn)?;

        Ok(Session {
            mailbox: Some(mailbox),
            worker: Some(worker),
            dropped_at_start: 0,
        })
    }
}

impl Drop for LivePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn offer_callback(mailbox: Arc<FrameMailbox>, stats: Arc<PipelineStats>) -> FrameCallback {
    Box::new(move |frame| {
        stats.record_captured();
        match mailbox.offer(frame) {
            Offer::Accepted => {}
            Offer::Replaced { dropped } | Offer::Rejected { dropped } => {
                stats.record_dropped();
                log::debug!("Dropped frame {dropped}: detector busy");
            }
            Offer::Closed => stats.record_dropped(),
        }
    })
}

fn inline_callback(pipeline: Arc<Mutex<FramePipeline>>, stats: Arc<PipelineStats>) -> FrameCallback {
    Box::new(move |frame| {
        stats.record_captured();
        let _ = lock(&pipeline).process(frame);
    })
}

/// Closes the mailbox, returning the index of a waiting frame it discarded.
fn discard_waiting(session: &Session, stats: &PipelineStats) -> Option<u64> {
    let index = session.mailbox.as_ref()?.close()?;
    stats.record_dropped();
    log::debug!("Discarded waiting frame {index} on stop");
    Some(index)
}

fn join_worker(session: &mut Session) {
    if let Some(worker) = session.worker.take() {
        if worker.join().is_err() {
            log::error!("Detection worker panicked");
        }
    }
}

fn lock(pipeline: &Mutex<FramePipeline>) -> MutexGuard<'_, FramePipeline> {
    pipeline.lock().unwrap_or_else(|e| e.into_inner())
}
