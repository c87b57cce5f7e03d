use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::tick;

use facecam_core::annotation::infrastructure::box_annotator::BoxAnnotator;
use facecam_core::capture::infrastructure::ffmpeg_frame_source::FfmpegFrameSource;
use facecam_core::detection::domain::face_detector::FaceDetector;
use facecam_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloDetector, DEFAULT_CONFIDENCE,
};
use facecam_core::pipeline::config::{
    BackpressurePolicy, DetectionFailurePolicy, PipelineConfig,
};
use facecam_core::pipeline::frame_pipeline::FramePipeline;
use facecam_core::pipeline::live_pipeline::LivePipeline;
use facecam_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facecam_core::preview::preview_sink::PreviewSink;
use facecam_core::preview::snapshot_writer::SnapshotWriter;
use facecam_core::shared::constants::{
    DEFAULT_DISPLAY_FPS, DEFAULT_STROKE_WIDTH, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use facecam_core::shared::model_resolver::ModelResolver;
use facecam_core::shared::rotation::Rotation;

/// Live face detection overlay for a camera or video stream.
#[derive(Parser)]
#[command(name = "facecam")]
struct Cli {
    /// Video file, stream URL (e.g. rtsp://...) or capture device.
    input: PathBuf,

    /// ONNX face model (downloaded to the cache directory if omitted).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Clockwise rotation applied to captured frames: 0, 90, 180 or 270.
    #[arg(long, default_value = "90", allow_negative_numbers = true)]
    rotation: i32,

    /// Frames arriving while detection is busy: replace, drop or inline.
    #[arg(long, default_value = "replace")]
    backpressure: String,

    /// Frames whose detection fails: empty (show unannotated) or drop.
    #[arg(long, default_value = "empty")]
    on_detection_error: String,

    /// Outline width in pixels.
    #[arg(long, default_value_t = DEFAULT_STROKE_WIDTH)]
    stroke_width: u32,

    /// Outline color as RRGGBB hex.
    #[arg(long, default_value = "00ff00")]
    stroke_color: String,

    /// Preview refresh rate.
    #[arg(long, default_value_t = DEFAULT_DISPLAY_FPS)]
    display_fps: f64,

    /// Stop after this many seconds (runs until the input ends if omitted).
    #[arg(long)]
    duration: Option<f64>,

    /// Restart the input from the beginning when it ends.
    #[arg(long)]
    loop_input: bool,

    /// Save the last preview frame to this image file on exit.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Resize the snapshot to WIDTHxHEIGHT (e.g. 640x360).
    #[arg(long, requires = "snapshot")]
    snapshot_size: Option<String>,

    /// Log progress every N published frames.
    #[arg(long, default_value = "30")]
    log_every: u64,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = PipelineConfig {
        rotation: Rotation::from_degrees(cli.rotation).ok_or("invalid rotation")?,
        backpressure: parse_backpressure(&cli.backpressure)?,
        on_detection_failure: parse_failure_policy(&cli.on_detection_error)?,
    };
    let annotator = BoxAnnotator::new(parse_hex_color(&cli.stroke_color)?, cli.stroke_width);
    let detector = build_detector(&cli)?;

    let sink = Arc::new(PreviewSink::new());
    let pipeline = FramePipeline::new(detector, Box::new(annotator), sink.clone(), config)
        .with_logger(Box::new(StdoutPipelineLogger::new(cli.log_every)));
    let source = FfmpegFrameSource::new(cli.input.clone()).with_looping(cli.loop_input);

    let mut live = LivePipeline::new(pipeline, Box::new(source));
    live.start()?;
    log::info!(
        "Streaming {} (rotation {}°, {:?})",
        cli.input.display(),
        config.rotation.degrees(),
        config.backpressure
    );

    present(&sink, &live, cli.display_fps, cli.duration.map(Duration::from_secs_f64));

    live.stop();
    live.log_summary();

    if let Some(path) = &cli.snapshot {
        let mut writer = SnapshotWriter::new();
        if let Some(size) = &cli.snapshot_size {
            let (width, height) = parse_size(size)?;
            writer = writer.with_size(width, height);
        }
        save_snapshot(&sink, &writer, path)?;
    }
    Ok(())
}

/// Presentation loop: refreshes at `display_fps`, showing the newest frame
/// only when the sink reports one.
fn present(sink: &PreviewSink, live: &LivePipeline, display_fps: f64, duration: Option<Duration>) {
    let updates = sink.subscribe();
    let refresh = tick(Duration::from_secs_f64(1.0 / display_fps));
    let started = Instant::now();
    let mut shown: u64 = 0;

    loop {
        let _ = refresh.recv();
        if updates.try_recv().is_ok() {
            if let Some(frame) = sink.current() {
                shown += 1;
                eprint!(
                    "\rFrame #{:<6} {}x{}  faces: {:<3} shown: {shown}",
                    frame.index(),
                    frame.width(),
                    frame.height(),
                    frame.rects().len()
                );
            }
        }

        if duration.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
        if !live.is_source_running() {
            log::info!("Input ended");
            break;
        }
    }
    eprintln!();
}

fn save_snapshot(
    sink: &PreviewSink,
    writer: &SnapshotWriter,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    match sink.current() {
        Some(frame) => {
            writer.write(path, &frame)?;
            log::info!("Snapshot of frame {} written to {}", frame.index(), path.display());
        }
        None => log::warn!("No frame was published; snapshot skipped"),
    }
    Ok(())
}

fn build_detector(cli: &Cli) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let model_path = match &cli.model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {YOLO_MODEL_NAME}");
            let path = ModelResolver::new()?.resolve(
                YOLO_MODEL_NAME,
                YOLO_MODEL_URL,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };
    Ok(Box::new(OnnxYoloDetector::new(&model_path, cli.confidence)?))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !is_stream_url(&cli.input) && !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if Rotation::from_degrees(cli.rotation).is_none() {
        return Err(format!(
            "Rotation must be a multiple of 90 degrees, got {}",
            cli.rotation
        )
        .into());
    }
    parse_backpressure(&cli.backpressure)?;
    parse_failure_policy(&cli.on_detection_error)?;
    parse_hex_color(&cli.stroke_color)?;
    if cli.stroke_width == 0 {
        return Err("Stroke width must be at least 1".into());
    }
    if !(cli.display_fps > 0.0 && cli.display_fps <= 240.0) {
        return Err(format!(
            "Display fps must be between 0 and 240, got {}",
            cli.display_fps
        )
        .into());
    }
    if let Some(size) = &cli.snapshot_size {
        parse_size(size)?;
    }
    if let Some(d) = cli.duration {
        if !(d > 0.0 && d.is_finite()) {
            return Err(format!("Duration must be a positive number of seconds, got {d}").into());
        }
    }
    Ok(())
}

/// Network inputs (`rtsp://`, `http://`, ...) are opened by ffmpeg directly.
fn is_stream_url(input: &Path) -> bool {
    input.to_string_lossy().contains("://")
}

fn parse_size(value: &str) -> Result<(u32, u32), Box<dyn std::error::Error>> {
    let invalid = || format!("Snapshot size must be WIDTHxHEIGHT, got '{value}'");
    let (w, h) = value.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid().into());
    }
    Ok((width, height))
}

fn parse_backpressure(value: &str) -> Result<BackpressurePolicy, Box<dyn std::error::Error>> {
    match value {
        "replace" => Ok(BackpressurePolicy::ReplaceWaiting),
        "drop" => Ok(BackpressurePolicy::DropIncoming),
        "inline" => Ok(BackpressurePolicy::Inline),
        other => Err(format!(
            "Backpressure must be one of: replace, drop, inline, got '{other}'"
        )
        .into()),
    }
}

fn parse_failure_policy(value: &str) -> Result<DetectionFailurePolicy, Box<dyn std::error::Error>> {
    match value {
        "empty" => Ok(DetectionFailurePolicy::TreatAsEmpty),
        "drop" => Ok(DetectionFailurePolicy::DropFrame),
        other => Err(format!(
            "Detection error handling must be 'empty' or 'drop', got '{other}'"
        )
        .into()),
    }
}

fn parse_hex_color(value: &str) -> Result<[u8; 3], Box<dyn std::error::Error>> {
    let hex = value.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(format!("Stroke color must be RRGGBB hex, got '{value}'").into());
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| format!("Stroke color must be RRGGBB hex, got '{value}'"))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
