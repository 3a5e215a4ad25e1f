// Cursor controller - pointer visibility and lock state machine
//
// Driven by window/input events and a cooperative idle deadline polled by
// the UI loop; there is no dedicated idle thread. The effective visibility
// is mirrored into an atomic flag for lock-free reads from other threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::DisplayConfig;

/// Pointer visibility/lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Pointer visible and free
    Visible,
    /// Hidden because the pointer sat idle past the timeout
    HiddenByIdle,
    /// Hidden by configuration (fullscreen without show-mouse)
    HiddenByUser,
    /// Hidden and confined to the window while fullscreen
    LockedFullscreen,
}

/// Configuration flags consumed by the cursor controller
#[derive(Debug, Clone, Copy)]
pub struct CursorSettings {
    pub disable_mouse: bool,
    pub mouse_hide_and_lock: bool,
    pub show_mouse_in_fullscreen: bool,
    pub lock_mouse_in_fullscreen: bool,
    pub hide_mouse_after_idletime: bool,
    pub hide_mouse_idletime_ms: u32,
}

impl From<&DisplayConfig> for CursorSettings {
    fn from(config: &DisplayConfig) -> Self {
        Self {
            disable_mouse: config.disable_mouse,
            mouse_hide_and_lock: config.mouse_hide_and_lock,
            show_mouse_in_fullscreen: config.show_mouse_in_fullscreen,
            lock_mouse_in_fullscreen: config.lock_mouse_in_fullscreen,
            hide_mouse_after_idletime: config.hide_mouse_after_idletime,
            hide_mouse_idletime_ms: config.hide_mouse_idletime,
        }
    }
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            disable_mouse: false,
            mouse_hide_and_lock: false,
            show_mouse_in_fullscreen: false,
            lock_mouse_in_fullscreen: true,
            hide_mouse_after_idletime: false,
            hide_mouse_idletime_ms: 2000,
        }
    }
}

/// State machine for pointer visibility and lock
///
/// Owned by the UI-affine thread. Event arrival order matters: idle-timer
/// and lock-toggle semantics depend on strict in-order processing, which
/// the single UI loop provides.
#[derive(Debug)]
pub struct InputCursorController {
    state: CursorState,
    settings: CursorSettings,
    pointer_visible: Arc<AtomicBool>,
    last_activity: Instant,
    fullscreen: bool,
}

impl InputCursorController {
    pub fn new(settings: CursorSettings) -> Self {
        Self {
            state: CursorState::Visible,
            settings,
            pointer_visible: Arc::new(AtomicBool::new(true)),
            last_activity: Instant::now(),
            fullscreen: false,
        }
    }

    /// Current cursor state
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Shared visibility flag for lock-free cross-thread reads
    pub fn pointer_visible_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.pointer_visible)
    }

    fn set_state(&mut self, state: CursorState) {
        if self.state != state {
            log::trace!("cursor {:?} -> {:?}", self.state, state);
            self.state = state;
        }
        self.pointer_visible
            .store(state == CursorState::Visible, Ordering::Release);
    }

    /// Pointer movement: restores an idle-hidden cursor and resets the
    /// idle timer
    pub fn on_mouse_move(&mut self, now: Instant) {
        self.last_activity = now;
        if self.settings.disable_mouse {
            return;
        }
        if self.state == CursorState::HiddenByIdle {
            self.set_state(CursorState::Visible);
        }
    }

    /// Double-click: toggles the fullscreen mouse lock when hide-and-lock
    /// is configured
    pub fn on_double_click(&mut self, now: Instant) {
        self.last_activity = now;
        if self.settings.disable_mouse || !self.settings.mouse_hide_and_lock {
            return;
        }
        if self.fullscreen {
            self.toggle_mouselock();
        }
    }

    /// Toggle Visible ↔ LockedFullscreen
    ///
    /// Locking only engages while fullscreen with lock-in-fullscreen or
    /// hide-and-lock enabled; unlocking always works.
    pub fn toggle_mouselock(&mut self) {
        if self.settings.disable_mouse {
            return;
        }
        if self.state == CursorState::LockedFullscreen {
            self.set_state(CursorState::Visible);
            self.last_activity = Instant::now();
        } else if self.fullscreen
            && (self.settings.lock_mouse_in_fullscreen || self.settings.mouse_hide_and_lock)
        {
            self.set_state(CursorState::LockedFullscreen);
        }
    }

    /// Whether the mouse is locked inside the window
    ///
    /// Also recomputes cursor visibility as a side effect, because callers
    /// asking for the lock state are about to make pointer-capture
    /// decisions based on it.
    pub fn get_mouse_lock_state(&mut self) -> bool {
        self.update_cursor();
        self.state == CursorState::LockedFullscreen
    }

    /// Recompute the effective state after a fullscreen enter/exit
    pub fn handle_visibility_change(&mut self, fullscreen: bool, now: Instant) {
        self.fullscreen = fullscreen;
        self.last_activity = now;
        self.update_cursor();
    }

    /// Recompute the effective state from the configuration flags
    pub fn update_cursor(&mut self) {
        if self.settings.disable_mouse {
            self.set_state(CursorState::Visible);
            return;
        }
        if self.fullscreen {
            if self.state == CursorState::LockedFullscreen {
                // An explicit lock toggle persists until toggled again or
                // fullscreen is left
            } else if self.settings.lock_mouse_in_fullscreen {
                self.set_state(CursorState::LockedFullscreen);
            } else if !self.settings.show_mouse_in_fullscreen {
                self.set_state(CursorState::HiddenByUser);
            } else {
                self.set_state(CursorState::Visible);
            }
        } else if matches!(
            self.state,
            CursorState::LockedFullscreen | CursorState::HiddenByUser
        ) {
            self.set_state(CursorState::Visible);
        }
    }

    /// Fire the idle transition if the deadline has passed
    ///
    /// Called cooperatively by the UI loop; returns true when the state
    /// changed so the backend can apply it to the native cursor.
    pub fn poll_idle(&mut self, now: Instant) -> bool {
        if !self.idle_hide_armed() {
            return false;
        }
        if now.duration_since(self.last_activity) >= self.idle_timeout() {
            self.set_state(CursorState::HiddenByIdle);
            return true;
        }
        false
    }

    /// Deadline at which [`poll_idle`](Self::poll_idle) would hide the
    /// cursor, for wait-until scheduling
    pub fn idle_deadline(&self) -> Option<Instant> {
        if self.idle_hide_armed() {
            Some(self.last_activity + self.idle_timeout())
        } else {
            None
        }
    }

    fn idle_hide_armed(&self) -> bool {
        !self.settings.disable_mouse
            && self.settings.hide_mouse_after_idletime
            && self.state == CursorState::Visible
    }

    fn idle_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.settings.hide_mouse_idletime_ms))
    }
}
