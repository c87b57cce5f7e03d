use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::capture::domain::frame_source::{CaptureError, FrameCallback, FrameSource};
use crate::shared::constants::FALLBACK_SOURCE_FPS;
use crate::shared::frame::Frame;
use crate::shared::pixel_format::PixelFormat;

/// Live frame source backed by ffmpeg-next (libavformat + libavcodec).
///
/// Plays any input ffmpeg can open (file, stream URL, capture device) on a
/// dedicated capture thread, converting each decoded picture to the
/// configured [`PixelFormat`]. With real-time pacing enabled, frames are
/// delivered at the stream's native rate and a frame that is already more
/// than one interval late is discarded, the way a camera overwrites its
/// capture buffer when nobody reads it.
pub struct FfmpegFrameSource {
    input: PathBuf,
    pixel_format: PixelFormat,
    looping: bool,
    realtime: bool,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl FfmpegFrameSource {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            pixel_format: PixelFormat::Rgb8,
            looping: false,
            realtime: true,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Restart from the beginning at end of input instead of stopping.
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// When disabled, frames are delivered as fast as they decode.
    pub fn with_realtime_pacing(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    fn reap_finished_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("Capture thread for {} panicked", self.input.display());
            }
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn start(&mut self, on_frame: FrameCallback) -> Result<(), CaptureError> {
        if self.running.load(Ordering::Acquire) {
            return Err(CaptureError::AlreadyRunning);
        }
        self.reap_finished_worker();

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);
        let settings = SessionSettings {
            input: self.input.clone(),
            pixel_format: self.pixel_format,
            looping: self.looping,
            realtime: self.realtime,
        };
        let running = self.running.clone();
        running.store(true, Ordering::Release);

        let spawned = thread::Builder::new()
            .name("facecam-capture".into())
            .spawn(move || {
                run_session(&settings, &running, on_frame, ready_tx);
                running.store(false, Ordering::Release);
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(CaptureError::Start(e.to_string()));
            }
        };
        self.worker = Some(handle);

        match ready_rx.recv() {
            Ok(Ok(())) => {
                log::info!("Capture started from {}", self.input.display());
                Ok(())
            }
            Ok(Err(reason)) => {
                self.reap_finished_worker();
                Err(CaptureError::Start(reason))
            }
            Err(_) => {
                self.reap_finished_worker();
                Err(CaptureError::Start("capture thread exited early".into()))
            }
        }
    }

    fn stop(&mut self) {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        self.reap_finished_worker();
        if was_running {
            log::info!("Capture stopped for {}", self.input.display());
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

struct SessionSettings {
    input: PathBuf,
    pixel_format: PixelFormat,
    looping: bool,
    realtime: bool,
}

/// Body of the capture thread. Reports the initial open result through
/// `ready`, then decodes until stopped or the input ends.
fn run_session(
    settings: &SessionSettings,
    running: &AtomicBool,
    mut on_frame: FrameCallback,
    ready: Sender<Result<(), String>>,
) {
    let mut opened = match OpenedInput::open(&settings.input, settings.pixel_format) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(format!("{}: {e}", settings.input.display())));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut pacer = Pacer::new(opened.fps, settings.realtime);
    let epoch = Instant::now();
    let mut index: u64 = 0;
    let mut stale: u64 = 0;

    loop {
        let (width, height) = (opened.width, opened.height);
        let completed = opened.decode(&mut |pixels: Vec<u8>| {
            if !running.load(Ordering::Acquire) {
                return false;
            }
            let frame_index = index;
            index += 1;

            if !pacer.wait_for_slot() {
                stale += 1;
                log::trace!("Discarding stale frame {frame_index}");
                return true;
            }
            if !running.load(Ordering::Acquire) {
                return false;
            }

            match Frame::try_new(
                pixels,
                width,
                height,
                settings.pixel_format,
                frame_index,
                epoch.elapsed(),
            ) {
                Ok(frame) => on_frame(frame),
                Err(e) => log::debug!("Skipping frame: {e}"),
            }
            true
        });

        if !completed || !settings.looping || !running.load(Ordering::Acquire) {
            break;
        }

        opened = match OpenedInput::open(&settings.input, settings.pixel_format) {
            Ok(reopened) => reopened,
            Err(e) => {
                log::error!("Failed to reopen {}: {e}", settings.input.display());
                break;
            }
        };
    }

    if stale > 0 {
        log::debug!("Capture discarded {stale} stale frames");
    }
}

/// Fixed-cadence delivery clock.
struct Pacer {
    interval: Duration,
    next_deadline: Option<Instant>,
    enabled: bool,
}

impl Pacer {
    fn new(fps: f64, enabled: bool) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / fps),
            next_deadline: None,
            enabled,
        }
    }

    /// Sleeps until the next frame slot. Returns false when the slot was
    /// missed by more than one interval and the frame should be discarded.
    fn wait_for_slot(&mut self) -> bool {
        if !self.enabled {
            return true;
        }
        let now = Instant::now();
        let deadline = *self.next_deadline.get_or_insert(now);
        self.next_deadline = Some(deadline + self.interval);

        if now < deadline {
            thread::sleep(deadline - now);
            true
        } else {
            now - deadline <= self.interval
        }
    }
}

/// An opened input with its decoder and pixel converter.
struct OpenedInput {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    fps: f64,
    bytes_per_pixel: usize,
}

impl OpenedInput {
    fn open(path: &Path, format: PixelFormat) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(&path)?;

        let (stream_index, fps, decoder) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or("No video stream found")?;

            let rate = stream.avg_frame_rate();
            let fps = if rate.numerator() > 0 && rate.denominator() > 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                FALLBACK_SOURCE_FPS
            };

            let codec_ctx =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
            (stream.index(), fps, codec_ctx.decoder().video()?)
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_pixel(format),
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            fps,
            bytes_per_pixel: format.bytes_per_pixel(),
        })
    }

    /// Decodes to end of input, passing each converted picture to `emit`.
    ///
    /// Returns false if `emit` asked to stop early. Packets or pictures
    /// that fail to decode or convert are skipped.
    fn decode(&mut self, emit: &mut dyn FnMut(Vec<u8>) -> bool) -> bool {
        let Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            bytes_per_pixel,
            ..
        } = self;
        let layout = (*width, *height, *bytes_per_pixel);

        for (stream, packet) in ictx.packets() {
            if stream.index() != *stream_index {
                continue;
            }
            if let Err(e) = decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }
            if !receive_pictures(decoder, scaler, layout, emit) {
                return false;
            }
        }

        let _ = decoder.send_eof();
        receive_pictures(decoder, scaler, layout, emit)
    }
}

fn receive_pictures(
    decoder: &mut ffmpeg_next::decoder::Video,
    scaler: &mut ffmpeg_next::software::scaling::Context,
    (width, height, bytes_per_pixel): (u32, u32, usize),
    emit: &mut dyn FnMut(Vec<u8>) -> bool,
) -> bool {
    let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
    while decoder.receive_frame(&mut decoded).is_ok() {
        let mut converted = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = scaler.run(&decoded, &mut converted) {
            log::debug!("Skipping picture that failed conversion: {e}");
            continue;
        }
        let pixels = extract_packed_pixels(&converted, width, height, bytes_per_pixel);
        if !emit(pixels) {
            return false;
        }
    }
    true
}

fn ffmpeg_pixel(format: PixelFormat) -> ffmpeg_next::format::Pixel {
    match format {
        PixelFormat::Rgb8 => ffmpeg_next::format::Pixel::RGB24,
        PixelFormat::Bgr8 => ffmpeg_next::format::Pixel::BGR24,
        PixelFormat::Rgba8 => ffmpeg_next::format::Pixel::RGBA,
        PixelFormat::Bgra8 => ffmpeg_next::format::Pixel::BGRA,
        PixelFormat::Gray8 => ffmpeg_next::format::Pixel::GRAY8,
    }
}

/// Copies a converted picture into a tightly packed buffer.
///
/// ffmpeg rows may carry padding (stride > width * bpp); it is stripped.
fn extract_packed_pixels(
    picture: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = picture.stride(0);
    let data = picture.data(0);
    let row_len = width as usize * bytes_per_pixel;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(row_len * h);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_len]);
    }
    pixels
}
