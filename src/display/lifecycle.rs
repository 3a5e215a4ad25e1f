// Window lifecycle - open/close/fullscreen state machine
//
// Owned by the UI-affine thread. The renderer thread only ever sees the
// closing flag, a lock-free atomic polled on the per-frame hot path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Window placement saved when entering fullscreen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Lifecycle state of the display window
///
/// Transitions happen only through [`WindowLifecycle`]; Closing → Closed is
/// monotonic and irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Windowed,
    Minimized,
    FullScreen,
    Closing,
    Closed,
}

/// What the window backend must do to complete a fullscreen toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenTransition {
    /// Enter fullscreen; the prior windowed geometry has been saved
    Enter,
    /// Leave fullscreen and restore this windowed geometry
    Restore(Geometry),
}

/// Open/close/fullscreen-toggle state machine
///
/// Coordinates shutdown with the renderer thread via a shared closing flag:
/// `close()` sets it exactly once and it never reverts.
#[derive(Debug)]
pub struct WindowLifecycle {
    state: WindowState,
    closing: Arc<AtomicBool>,
    windowed_geometry: Option<Geometry>,
}

impl WindowLifecycle {
    pub fn new() -> Self {
        Self {
            state: WindowState::Windowed,
            closing: Arc::new(AtomicBool::new(false)),
            windowed_geometry: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Shared closing flag, polled lock-free by the renderer thread
    pub fn closing_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closing)
    }

    /// Whether `close()` has been called
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Whether the window is currently visible (not minimized, not closed)
    pub fn shown(&self) -> bool {
        matches!(self.state, WindowState::Windowed | WindowState::FullScreen)
    }

    /// Begin shutdown
    ///
    /// Sets the cross-thread closing flag so the renderer stops producing.
    /// Idempotent: a second call is a no-op.
    pub fn close(&mut self) {
        match self.state {
            WindowState::Closing | WindowState::Closed => {
                log::debug!("close() called again, ignoring");
            }
            _ => {
                log::info!("window closing");
                self.state = WindowState::Closing;
                self.closing.store(true, Ordering::Release);
            }
        }
    }

    /// Finish shutdown after the surface has been torn down
    ///
    /// Only meaningful in the Closing state; otherwise a no-op.
    pub fn mark_closed(&mut self) {
        if self.state == WindowState::Closing {
            self.state = WindowState::Closed;
        }
    }

    /// Flip Windowed ↔ FullScreen
    ///
    /// `current` is the live windowed geometry, saved on the way in so it
    /// can be restored on the way out. Returns what the backend must do,
    /// or None when the window is closing or closed.
    pub fn toggle_fullscreen(&mut self, current: Geometry) -> Option<FullscreenTransition> {
        match self.state {
            WindowState::Windowed | WindowState::Minimized => {
                self.windowed_geometry = Some(current);
                self.state = WindowState::FullScreen;
                Some(FullscreenTransition::Enter)
            }
            WindowState::FullScreen => {
                self.state = WindowState::Windowed;
                let restore = self.windowed_geometry.take().unwrap_or(current);
                Some(FullscreenTransition::Restore(restore))
            }
            WindowState::Closing | WindowState::Closed => None,
        }
    }

    /// Track minimize/restore reported by the windowing system
    ///
    /// Ignored while fullscreen or shutting down.
    pub fn set_minimized(&mut self, minimized: bool) {
        match (self.state, minimized) {
            (WindowState::Windowed, true) => self.state = WindowState::Minimized,
            (WindowState::Minimized, false) => self.state = WindowState::Windowed,
            _ => {}
        }
    }
}

impl Default for WindowLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
