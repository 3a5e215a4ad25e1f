// Capture - screenshot and continuous video capture
//
// Screenshots snapshot the most recently presented frame and are saved as
// PNG files. Continuous capture hands owned frame copies to a sink running
// on its own worker; the sink drops frames when it falls behind so the
// presenter never blocks on it. Capture failures are logged and never
// affect presentation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use crate::display::frame::Frame;
use crate::display::presenter::FramePresenter;

/// Errors that can occur while encoding or writing captures
#[derive(Debug)]
pub enum CaptureError {
    /// I/O error
    Io(io::Error),

    /// PNG encoding error
    PngEncoding(png::EncodingError),

    /// Encoder-specific failure (continuous capture)
    Encoder(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Io(e) => write!(f, "I/O error: {}", e),
            CaptureError::PngEncoding(e) => write!(f, "PNG encoding error: {}", e),
            CaptureError::Encoder(msg) => write!(f, "encoder error: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<io::Error> for CaptureError {
    fn from(e: io::Error) -> Self {
        CaptureError::Io(e)
    }
}

impl From<png::EncodingError> for CaptureError {
    fn from(e: png::EncodingError) -> Self {
        CaptureError::PngEncoding(e)
    }
}

/// On-demand screenshot service
///
/// Owned by the UI thread; `take_screenshot` is synchronous and consumes a
/// private frame copy, never the live staging buffer.
#[derive(Debug)]
pub struct CaptureService {
    screenshot_dir: PathBuf,
}

impl CaptureService {
    pub fn new(screenshot_dir: PathBuf) -> Self {
        Self { screenshot_dir }
    }

    /// Save a frame as a timestamped PNG
    ///
    /// Best-effort: encode and write failures are logged and swallowed, so
    /// a failing screenshot can never take down presentation.
    pub fn take_screenshot(&self, frame: Frame) {
        match self.save_screenshot(&frame) {
            Ok(path) => log::info!("screenshot saved to {}", path.display()),
            Err(err) => log::warn!("screenshot failed: {}", err),
        }
    }

    /// Snapshot the presenter's most recently presented frame
    ///
    /// No-op (with a log line) when nothing has been presented yet.
    pub fn screenshot_last_presented(&self, presenter: &FramePresenter) {
        match presenter.last_presented_frame() {
            Some(frame) => self.take_screenshot(frame),
            None => log::info!("screenshot requested before any frame was presented"),
        }
    }

    fn save_screenshot(&self, frame: &Frame) -> Result<PathBuf, CaptureError> {
        fs::create_dir_all(&self.screenshot_dir)?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S%.3f");
        let filename = format!("screenshot_{}.png", timestamp);
        let file_path = self.screenshot_dir.join(filename);

        let rgba = frame.to_rgba();
        save_png(&file_path, &rgba, frame.width(), frame.height())?;

        Ok(file_path)
    }
}

/// Save RGBA data as a PNG file
fn save_png(path: &Path, data: &[u8], width: u32, height: u32) -> Result<(), CaptureError> {
    let file = fs::File::create(path)?;
    let w = io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(data)?;

    Ok(())
}

/// Continuous-capture sink fed a copy of every presented frame
///
/// Attached to the presenter as `Arc<dyn VideoSink>`; the attachment is
/// shared ownership, living as long as the longer of the presenter and the
/// holder's handle. `push_frame` must never block.
pub trait VideoSink: Send + Sync {
    /// Accept an owned copy of a presented frame
    fn push_frame(&self, frame: Frame);
}

/// Encoder driven by a [`ChannelVideoSink`] worker
///
/// Container format and file naming are the encoder's business; this layer
/// only hands it frames in presentation order.
pub trait VideoEncoder: Send {
    /// Encode one frame
    fn encode_frame(&mut self, frame: Frame) -> Result<(), CaptureError>;

    /// Flush any buffered output; called once when capture ends
    fn finish(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }
}

/// Video sink backed by a bounded channel and a worker thread
///
/// Frames are forwarded with a non-blocking try-send; when the worker falls
/// behind, frames are dropped and counted. The worker drains remaining
/// frames and finishes the encoder once the last sink handle is dropped.
pub struct ChannelVideoSink {
    tx: mpsc::SyncSender<Frame>,
    dropped: AtomicU64,
}

impl ChannelVideoSink {
    /// Spawn a worker around `encoder` with room for `capacity` in-flight
    /// frames
    ///
    /// If the worker thread cannot be started the failure is logged and
    /// the returned sink quietly drops every frame pushed into it, so
    /// capture setup can never take down presentation.
    pub fn spawn<E: VideoEncoder + 'static>(mut encoder: E, capacity: usize) -> Arc<Self> {
        let (tx, rx) = mpsc::sync_channel::<Frame>(capacity.max(1));

        let worker = thread::Builder::new()
            .name("video-capture".into())
            .spawn(move || {
                while let Ok(frame) = rx.recv() {
                    if let Err(err) = encoder.encode_frame(frame) {
                        log::warn!("video encode failed: {}", err);
                    }
                }
                if let Err(err) = encoder.finish() {
                    log::warn!("video finish failed: {}", err);
                }
            });
        if let Err(err) = worker {
            // The receiver died with the failed spawn, so pushes hit the
            // disconnected branch and are counted as dropped.
            log::warn!("video capture worker failed to start: {}", err);
        }

        Arc::new(Self {
            tx,
            dropped: AtomicU64::new(0),
        })
    }

    /// Frames dropped because the worker fell behind
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl VideoSink for ChannelVideoSink {
    fn push_frame(&self, frame: Frame) {
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::TrySendError::Full(_)) => {
                log::trace!("video sink behind, dropping frame");
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::TrySendError::Disconnected(_)) => {
                log::debug!("video sink worker gone, dropping frame");
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    struct CountingEncoder {
        frames: Arc<Mutex<Vec<(u32, u32)>>>,
        finished: Arc<AtomicU64>,
    }

    impl VideoEncoder for CountingEncoder {
        fn encode_frame(&mut self, frame: Frame) -> Result<(), CaptureError> {
            self.frames.lock().unwrap().push((frame.width(), frame.height()));
            Ok(())
        }

        fn finish(&mut self) -> Result<(), CaptureError> {
            self.finished.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[test]
    fn test_screenshot_writes_png() {
        let dir = std::env::temp_dir().join(format!("emu_display_sshot_{}", std::process::id()));
        let service = CaptureService::new(dir.clone());

        let frame = Frame::test_pattern(16, 8, 0);
        let path = service.save_screenshot(&frame).expect("screenshot failed");
        assert!(path.exists());

        let meta = fs::metadata(&path).unwrap();
        assert!(meta.len() > 0);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_screenshot_failure_is_swallowed() {
        // A file where the directory should be makes create_dir_all fail
        let bogus = std::env::temp_dir().join(format!("emu_display_flat_{}", std::process::id()));
        fs::write(&bogus, b"not a directory").unwrap();

        let service = CaptureService::new(bogus.clone());
        // Must not panic or propagate
        service.take_screenshot(Frame::test_pattern(4, 4, 0));

        let _ = fs::remove_file(bogus);
    }

    #[test]
    fn test_video_sink_forwards_frames() {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let finished = Arc::new(AtomicU64::new(0));
        let sink = ChannelVideoSink::spawn(
            CountingEncoder {
                frames: Arc::clone(&frames),
                finished: Arc::clone(&finished),
            },
            8,
        );

        for tick in 0..5 {
            sink.push_frame(Frame::test_pattern(4, 4, tick));
        }

        // Dropping the only handle ends the worker, which drains and
        // finishes the encoder.
        drop(sink);
        for _ in 0..50 {
            if finished.load(Ordering::Relaxed) == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(finished.load(Ordering::Relaxed), 1);
        assert_eq!(frames.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_push_without_worker_drops_quietly() {
        // A sink whose worker is gone (as after a failed spawn) must keep
        // absorbing frames without blocking or panicking
        let (tx, rx) = mpsc::sync_channel::<Frame>(1);
        drop(rx);
        let sink = ChannelVideoSink {
            tx,
            dropped: AtomicU64::new(0),
        };

        sink.push_frame(Frame::test_pattern(2, 2, 0));
        sink.push_frame(Frame::test_pattern(2, 2, 1));
        assert_eq!(sink.dropped_count(), 2);
    }

    struct SlowEncoder;

    impl VideoEncoder for SlowEncoder {
        fn encode_frame(&mut self, _frame: Frame) -> Result<(), CaptureError> {
            thread::sleep(Duration::from_millis(50));
            Ok(())
        }
    }

    #[test]
    fn test_video_sink_drops_when_behind() {
        let sink = ChannelVideoSink::spawn(SlowEncoder, 1);

        // Flood far faster than the encoder can drain
        for tick in 0..20 {
            sink.push_frame(Frame::test_pattern(2, 2, tick));
        }

        assert!(sink.dropped_count() > 0);
    }
}
