// Frame presenter - admission control and hand-off between threads
//
// The renderer thread calls can_consume_frame/present_frame and never
// blocks; the UI-affine thread calls flip. At most one frame is ever
// buffered awaiting flip. Cross-thread signaling is limited to single-word
// atomics; the staging slot mutex is held only for O(1) moves, never
// across a draw.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::frame::Frame;
use super::surface::{DisplayContext, FrameSurface};
use crate::capture::VideoSink;

/// Admission control and frame hand-off between the renderer thread and a
/// display surface
///
/// Shared as `Arc<FramePresenter>` between the producer and the UI thread.
pub struct FramePresenter {
    /// Set once by WindowLifecycle::close, never reverts
    closing: Arc<AtomicBool>,
    /// True while a staged frame awaits flip
    frame_pending: AtomicBool,
    /// The single staged frame
    staged: Mutex<Option<Frame>>,
    /// Snapshot of the most recently flipped frame, for capture
    last_presented: Mutex<Option<Frame>>,
    /// Continuous-capture sink; receives a copy of every presented frame
    video_sink: Mutex<Option<Arc<dyn VideoSink>>>,
    /// Total flips, including skipped ones
    frames: AtomicU64,
    /// Frames refused at admission or with invalid buffers
    dropped: AtomicU64,
    /// Whether the most recent flip actually showed a frame
    flip_showed_frame: AtomicBool,
}

impl FramePresenter {
    /// Create a presenter wired to the lifecycle's closing flag
    pub fn new(closing: Arc<AtomicBool>) -> Self {
        Self {
            closing,
            frame_pending: AtomicBool::new(false),
            staged: Mutex::new(None),
            last_presented: Mutex::new(None),
            video_sink: Mutex::new(None),
            frames: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            flip_showed_frame: AtomicBool::new(false),
        }
    }

    /// Whether the window is shutting down
    ///
    /// Renderer threads poll this to stop producing.
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Non-blocking admission query
    ///
    /// True iff the window is not closing and the previously submitted
    /// frame has already been flipped. This is the sole backpressure
    /// signal; the renderer must check it before producing the next frame
    /// and must never block on it.
    pub fn can_consume_frame(&self) -> bool {
        !self.closing.load(Ordering::Acquire) && !self.frame_pending.load(Ordering::Acquire)
    }

    /// Submit a frame for presentation, transferring buffer ownership
    ///
    /// Requires `data.len() == width * height * 4`. If admission is
    /// currently denied the frame is silently dropped (at-most-one-buffered
    /// semantics, no latest-frame-wins queueing). Never fails to the
    /// caller; the producer is responsible for self-throttling via
    /// [`can_consume_frame`](Self::can_consume_frame).
    pub fn present_frame(&self, data: Vec<u8>, width: u32, height: u32, is_bgra: bool) {
        let frame = match Frame::new(data, width, height, is_bgra) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("rejecting presented frame: {}", err);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        if !self.can_consume_frame() {
            // The producer races admission legitimately during shutdown,
            // so this is not an assertion.
            log::trace!("dropping frame: admission denied");
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        // The flag must change together with the slot: a flip landing
        // between the two stores would otherwise leave the flag set with
        // nothing staged, denying admission forever.
        let mut staged = self.staged.lock().unwrap();
        *staged = Some(frame);
        self.frame_pending.store(true, Ordering::Release);
    }

    /// Make the staged frame visible
    ///
    /// UI-affine: must run on the thread that owns the surface. With
    /// `skip_frame` the visible content is unchanged but frame-count
    /// bookkeeping still advances. Becomes a no-op after `close()`. When no
    /// new frame is staged the last presented frame is redrawn so resizes
    /// and expose events keep the window content.
    pub fn flip(&self, surface: &mut dyn FrameSurface, context: &DisplayContext, skip_frame: bool) {
        if self.closing.load(Ordering::Acquire) {
            log::debug!("flip after close, ignoring");
            return;
        }

        self.frames.fetch_add(1, Ordering::Relaxed);

        // Emptying the slot and clearing the flag happen under the same
        // lock as staging, so the flag always mirrors slot occupancy.
        let staged = {
            let mut slot = self.staged.lock().unwrap();
            self.frame_pending.store(false, Ordering::Release);
            slot.take()
        };

        if skip_frame {
            // Bookkeeping advanced above; the staged frame (if any) is
            // discarded without being shown.
            self.flip_showed_frame.store(false, Ordering::Relaxed);
            return;
        }

        match staged {
            Some(frame) => {
                if let Err(err) = surface.draw(context, &frame) {
                    log::warn!("surface draw failed: {}", err);
                }
                if let Some(sink) = self.video_sink.lock().unwrap().clone() {
                    sink.push_frame(frame.clone());
                }
                *self.last_presented.lock().unwrap() = Some(frame);
                self.flip_showed_frame.store(true, Ordering::Relaxed);
            }
            None => {
                // Expose/redraw without a new frame
                let last = self.last_presented.lock().unwrap();
                if let Some(frame) = last.as_ref() {
                    if let Err(err) = surface.draw(context, frame) {
                        log::warn!("surface redraw failed: {}", err);
                    }
                }
                self.flip_showed_frame.store(false, Ordering::Relaxed);
            }
        }
    }

    /// Private copy of the most recently presented frame
    ///
    /// Screenshot paths use this instead of the live staging buffer so an
    /// in-flight present can never tear the produced image.
    pub fn last_presented_frame(&self) -> Option<Frame> {
        self.last_presented.lock().unwrap().clone()
    }

    /// Attach a continuous-capture sink
    ///
    /// The sink receives an owned copy of every presented frame and is
    /// responsible for its own backpressure; the presenter never blocks on
    /// it. Shared ownership: the sink lives as long as the longer of the
    /// presenter and the caller's handle.
    pub fn attach_video_sink(&self, sink: Arc<dyn VideoSink>) {
        *self.video_sink.lock().unwrap() = Some(sink);
    }

    /// Detach the continuous-capture sink, if any
    pub fn detach_video_sink(&self) {
        *self.video_sink.lock().unwrap() = None;
    }

    /// Total number of flips, including skipped frames
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Frames refused at admission or rejected for invalid buffers
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Whether the most recent flip drew a newly presented frame
    pub fn flip_showed_frame(&self) -> bool {
        self.flip_showed_frame.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::surface::HeadlessSurface;

    fn presenter() -> (FramePresenter, Arc<AtomicBool>) {
        let closing = Arc::new(AtomicBool::new(false));
        (FramePresenter::new(Arc::clone(&closing)), closing)
    }

    fn rgba(width: u32, height: u32) -> Vec<u8> {
        vec![0xAA; width as usize * height as usize * 4]
    }

    #[test]
    fn test_single_frame_in_flight() {
        let (presenter, _closing) = presenter();
        assert!(presenter.can_consume_frame());

        presenter.present_frame(rgba(4, 4), 4, 4, false);
        assert!(!presenter.can_consume_frame());

        // Second submission without a flip is dropped
        presenter.present_frame(rgba(4, 4), 4, 4, false);
        assert_eq!(presenter.dropped_count(), 1);

        let mut surface = HeadlessSurface::new(64, 64);
        let ctx = surface.make_context().unwrap();
        presenter.flip(&mut surface, &ctx, false);

        assert!(presenter.can_consume_frame());
        assert_eq!(surface.draw_count(), 1);
        assert!(presenter.flip_showed_frame());
        surface.delete_context(ctx).unwrap();
    }

    #[test]
    fn test_concurrent_presents_and_flips_never_stall_admission() {
        use std::thread;
        use std::time::{Duration, Instant};

        let (presenter, _closing) = presenter();
        let presenter = Arc::new(presenter);
        let mut surface = HeadlessSurface::new(64, 64);
        let ctx = surface.make_context().unwrap();

        const ROUNDS: u64 = 2000;
        let producer = {
            let presenter = Arc::clone(&presenter);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    while !presenter.can_consume_frame() {
                        thread::yield_now();
                    }
                    presenter.present_frame(rgba(4, 4), 4, 4, false);
                }
            })
        };

        // Flip as fast as possible so flips land at every point of the
        // submission path. A flip racing a submission must never leave
        // admission denied with nothing staged.
        let deadline = Instant::now() + Duration::from_secs(30);
        let mut shown: u64 = 0;
        while shown < ROUNDS {
            presenter.flip(&mut surface, &ctx, false);
            if presenter.flip_showed_frame() {
                shown += 1;
            }
            assert!(
                Instant::now() < deadline,
                "admission stalled with nothing staged"
            );
        }

        producer.join().unwrap();
        assert!(presenter.can_consume_frame());
        assert_eq!(presenter.dropped_count(), 0);
        surface.delete_context(ctx).unwrap();
    }

    #[test]
    fn test_invalid_buffer_rejected() {
        let (presenter, _closing) = presenter();
        presenter.present_frame(vec![0; 10], 4, 4, false);
        assert_eq!(presenter.dropped_count(), 1);
        // Nothing staged
        assert!(presenter.can_consume_frame());
    }

    #[test]
    fn test_skip_frame_advances_bookkeeping_only() {
        let (presenter, _closing) = presenter();
        let mut surface = HeadlessSurface::new(64, 64);
        let ctx = surface.make_context().unwrap();

        presenter.present_frame(rgba(4, 4), 4, 4, false);
        presenter.flip(&mut surface, &ctx, true);

        assert_eq!(presenter.frame_count(), 1);
        assert_eq!(surface.draw_count(), 0);
        assert!(!presenter.flip_showed_frame());
        // Slot is free again
        assert!(presenter.can_consume_frame());
        surface.delete_context(ctx).unwrap();
    }

    #[test]
    fn test_admission_denied_forever_after_close() {
        let (presenter, closing) = presenter();
        closing.store(true, Ordering::Release);

        assert!(!presenter.can_consume_frame());
        presenter.present_frame(rgba(4, 4), 4, 4, false);
        assert_eq!(presenter.dropped_count(), 1);

        let mut surface = HeadlessSurface::new(64, 64);
        let ctx = surface.make_context().unwrap();
        presenter.flip(&mut surface, &ctx, false);
        assert_eq!(presenter.frame_count(), 0);
        assert_eq!(surface.draw_count(), 0);
        surface.delete_context(ctx).unwrap();
    }

    #[test]
    fn test_redraw_reuses_last_presented() {
        let (presenter, _closing) = presenter();
        let mut surface = HeadlessSurface::new(64, 64);
        let ctx = surface.make_context().unwrap();

        presenter.present_frame(rgba(8, 8), 8, 8, false);
        presenter.flip(&mut surface, &ctx, false);
        // Expose event without a new frame
        presenter.flip(&mut surface, &ctx, false);

        assert_eq!(surface.draw_count(), 2);
        assert_eq!(surface.last_drawn(), Some((8, 8)));
        assert_eq!(presenter.frame_count(), 2);
        surface.delete_context(ctx).unwrap();
    }

    #[test]
    fn test_last_presented_is_a_private_copy() {
        let (presenter, _closing) = presenter();
        let mut surface = HeadlessSurface::new(64, 64);
        let ctx = surface.make_context().unwrap();

        presenter.present_frame(vec![0x11; 4 * 4 * 4], 4, 4, false);
        presenter.flip(&mut surface, &ctx, false);

        let snapshot = presenter.last_presented_frame().unwrap();
        // Overwrite the live slot with a different frame
        presenter.present_frame(vec![0x22; 4 * 4 * 4], 4, 4, false);
        presenter.flip(&mut surface, &ctx, false);

        assert!(snapshot.data().iter().all(|&b| b == 0x11));
        surface.delete_context(ctx).unwrap();
    }
}
