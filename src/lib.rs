// Emulator display layer
// Frame presentation, window lifecycle, cursor handling, progress
// reporting, and capture. Frames arrive pre-rendered from the emulation
// core; this crate puts them on screen.

// Public modules
pub mod capture;
pub mod config;
pub mod display;
pub mod input;
pub mod progress;

// Re-export main types for convenience
pub use capture::{CaptureError, CaptureService, ChannelVideoSink, VideoEncoder, VideoSink};
pub use config::DisplayConfig;
pub use display::{
    run_display, DisplayContext, DisplayWindow, Frame, FramePresenter, FrameSurface,
    HeadlessSurface, SurfaceError, WindowLifecycle, WindowState,
};
pub use input::{CursorSettings, CursorState, InputCursorController};
pub use progress::{CallbackSink, NullSink, PercentSink, ProgressReporter, ProgressSink};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_components() {
        // Test that the core components can be instantiated together
        let lifecycle = WindowLifecycle::new();
        let presenter = FramePresenter::new(lifecycle.closing_flag());
        let _cursor = InputCursorController::new(CursorSettings::default());
        let _reporter = ProgressReporter::new(100, Box::new(NullSink));
        let _surface = HeadlessSurface::new(1280, 720);

        assert!(presenter.can_consume_frame());
    }
}
