// Window backend - native window and surface built on winit + pixels
//
// Owns the UI-affine side of the display layer: the event loop drives
// flips, cursor handling, and lifecycle transitions. The renderer thread
// only ever touches the shared FramePresenter.

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::{Pixels, PixelsBuilder, SurfaceTexture};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Fullscreen, Window, WindowId};

use super::frame::{Frame, BYTES_PER_PIXEL};
use super::lifecycle::{FullscreenTransition, Geometry, WindowLifecycle, WindowState};
use super::presenter::FramePresenter;
use super::surface::{ContextSlot, DisplayContext, FrameSurface, SurfaceError};
use crate::capture::CaptureService;
use crate::config::DisplayConfig;
use crate::input::cursor::{CursorSettings, CursorState, InputCursorController};
use crate::progress::{NullSink, ProgressReporter, ProgressSink};

/// Base output resolution before window scaling
pub const BASE_WIDTH: u32 = 1280;
/// Base output resolution before window scaling
pub const BASE_HEIGHT: u32 = 720;

/// Two presses of the primary button within this window count as a
/// double-click (winit delivers no double-click event)
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

/// Window title refresh interval for the FPS readout
const TITLE_REFRESH: Duration = Duration::from_secs(1);

/// FrameSurface backend over the pixels crate
///
/// The pixel buffer is resized to follow the dimensions of incoming
/// frames, so the emulated GPU may change resolution mid-session.
struct PixelsSurface {
    pixels: Pixels<'static>,
    contexts: ContextSlot,
    buffer_size: (u32, u32),
    client_size: (u32, u32),
}

impl PixelsSurface {
    fn new(pixels: Pixels<'static>, client_size: (u32, u32)) -> Self {
        Self {
            pixels,
            contexts: ContextSlot::new(),
            buffer_size: (BASE_WIDTH, BASE_HEIGHT),
            client_size,
        }
    }

    /// Track a window resize
    fn resize_client(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.client_size = (width, height);
        if let Err(err) = self.pixels.resize_surface(width, height) {
            log::warn!("surface resize failed: {}", err);
        }
    }
}

impl FrameSurface for PixelsSurface {
    fn make_context(&mut self) -> Result<DisplayContext, SurfaceError> {
        self.contexts.make()
    }

    fn delete_context(&mut self, context: DisplayContext) -> Result<(), SurfaceError> {
        self.contexts.delete(context)
    }

    fn draw(&mut self, context: &DisplayContext, frame: &Frame) -> Result<(), SurfaceError> {
        if !self.contexts.is_alive() {
            return Err(SurfaceError::UnknownContext(context.id()));
        }

        let dims = (frame.width(), frame.height());
        if dims != self.buffer_size {
            self.pixels
                .resize_buffer(dims.0, dims.1)
                .map_err(|e| SurfaceError::Draw(e.to_string()))?;
            self.buffer_size = dims;
        }

        let target = self.pixels.frame_mut();
        target.copy_from_slice(frame.data());
        if frame.is_bgra() {
            for px in target.chunks_exact_mut(BYTES_PER_PIXEL) {
                px.swap(0, 2);
            }
        }

        self.pixels
            .render()
            .map_err(|e| SurfaceError::Draw(e.to_string()))
    }

    fn client_width(&self) -> u32 {
        self.client_size.0
    }

    fn client_height(&self) -> u32 {
        self.client_size.1
    }
}

/// Native display window tying the presentation layer together
///
/// Created before the event loop starts; the window and surface come up on
/// `resumed`. Hand the shared presenter to the renderer thread before
/// running the loop.
pub struct DisplayWindow {
    config: DisplayConfig,
    window: Option<Arc<Window>>,
    surface: Option<PixelsSurface>,
    context: Option<DisplayContext>,
    lifecycle: WindowLifecycle,
    cursor: InputCursorController,
    presenter: Arc<FramePresenter>,
    capture: CaptureService,
    progress: ProgressReporter,
    hidden_by_user: bool,
    last_click: Option<Instant>,
    title_refreshed: Instant,
    frames_at_refresh: u64,
}

impl DisplayWindow {
    /// Create a display window from configuration (window opens when the
    /// event loop starts)
    pub fn new(config: DisplayConfig) -> Self {
        let lifecycle = WindowLifecycle::new();
        let presenter = Arc::new(FramePresenter::new(lifecycle.closing_flag()));
        let cursor = InputCursorController::new(CursorSettings::from(&config));
        let capture = CaptureService::new(config.screenshot_directory.clone());
        let progress = ProgressReporter::new(config.progress_gauge_max, Box::new(NullSink));

        Self {
            config,
            window: None,
            surface: None,
            context: None,
            lifecycle,
            cursor,
            presenter,
            capture,
            progress,
            hidden_by_user: false,
            last_click: None,
            title_refreshed: Instant::now(),
            frames_at_refresh: 0,
        }
    }

    /// Shared presenter handle for the renderer thread
    pub fn presenter(&self) -> Arc<FramePresenter> {
        Arc::clone(&self.presenter)
    }

    /// Replace the host-shell progress sink
    ///
    /// Chosen at construction time per platform; the default is the no-op
    /// sink for hosts without a progress API.
    pub fn with_progress_sink(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.progress = ProgressReporter::new(self.config.progress_gauge_max, sink);
        self
    }

    /// Host-shell progress gauge, driven by emulation-core ticks
    pub fn progress_mut(&mut self) -> &mut ProgressReporter {
        &mut self.progress
    }

    /// Current lifecycle state
    pub fn window_state(&self) -> WindowState {
        self.lifecycle.state()
    }

    /// Whether the mouse is locked inside the window
    ///
    /// Forwards to the cursor controller, which also recomputes cursor
    /// visibility as a documented side effect.
    pub fn get_mouse_lock_state(&mut self) -> bool {
        let locked = self.cursor.get_mouse_lock_state();
        self.apply_cursor_state();
        locked
    }

    /// Whether the window is currently visible
    pub fn shown(&self) -> bool {
        self.lifecycle.shown()
    }

    /// Hide the window
    ///
    /// UI-affine: must be called on the event-loop thread, never from the
    /// renderer thread. The lifecycle state machine has a single
    /// not-visible-while-open state (Minimized), so both caller-initiated
    /// hiding and occlusion land there; `hidden_by_user` remembers which
    /// it was so occlusion updates cannot reveal a hidden window.
    pub fn hide(&mut self) {
        self.hidden_by_user = true;
        if let Some(window) = self.window.as_ref() {
            window.set_visible(false);
        }
        self.lifecycle.set_minimized(true);
    }

    /// Show the window again after [`hide`](Self::hide)
    ///
    /// UI-affine, like [`hide`](Self::hide).
    pub fn show(&mut self) {
        self.hidden_by_user = false;
        if let Some(window) = self.window.as_ref() {
            window.set_visible(true);
        }
        self.lifecycle.set_minimized(false);
    }

    /// Occlusion reported by the windowing system
    ///
    /// Ignored while the caller has hidden the window explicitly; only
    /// [`show`](Self::show) may bring it back.
    fn handle_occluded(&mut self, occluded: bool) {
        if !self.hidden_by_user {
            self.lifecycle.set_minimized(occluded);
        }
    }

    fn window_geometry(&self) -> Geometry {
        let (x, y) = self
            .window
            .as_ref()
            .and_then(|w| w.outer_position().ok())
            .map(|p| (p.x, p.y))
            .unwrap_or((0, 0));
        let size = self
            .window
            .as_ref()
            .map(|w| w.inner_size())
            .unwrap_or_else(|| PhysicalSize::new(BASE_WIDTH, BASE_HEIGHT));
        Geometry {
            x,
            y,
            width: size.width,
            height: size.height,
        }
    }

    fn toggle_fullscreen(&mut self) {
        let transition = self.lifecycle.toggle_fullscreen(self.window_geometry());
        let Some(window) = self.window.as_ref() else {
            return;
        };

        match transition {
            Some(FullscreenTransition::Enter) => {
                window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                self.cursor.handle_visibility_change(true, Instant::now());
            }
            Some(FullscreenTransition::Restore(geometry)) => {
                window.set_fullscreen(None);
                let _ = window
                    .request_inner_size(PhysicalSize::new(geometry.width, geometry.height));
                window.set_outer_position(PhysicalPosition::new(geometry.x, geometry.y));
                self.cursor.handle_visibility_change(false, Instant::now());
            }
            None => return,
        }
        self.apply_cursor_state();
    }

    /// Drive the native cursor to match the controller's state
    fn apply_cursor_state(&mut self) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        match self.cursor.state() {
            CursorState::Visible => {
                window.set_cursor_visible(true);
                let _ = window.set_cursor_grab(CursorGrabMode::None);
            }
            CursorState::HiddenByIdle | CursorState::HiddenByUser => {
                window.set_cursor_visible(false);
                let _ = window.set_cursor_grab(CursorGrabMode::None);
            }
            CursorState::LockedFullscreen => {
                window.set_cursor_visible(false);
                if let Err(err) = window.set_cursor_grab(CursorGrabMode::Confined) {
                    log::debug!("cursor grab unavailable: {}", err);
                }
            }
        }
    }

    fn handle_hotkey(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        if self.config.disable_kb_hotkeys {
            return;
        }
        match code {
            KeyCode::F11 => self.toggle_fullscreen(),
            KeyCode::F12 => self.capture.screenshot_last_presented(&self.presenter),
            KeyCode::Escape => {
                if self.lifecycle.state() == WindowState::FullScreen {
                    self.toggle_fullscreen();
                } else {
                    self.shutdown(event_loop);
                }
            }
            _ => {}
        }
    }

    /// Close the window and tear down the surface
    ///
    /// Sets the closing flag first so the renderer stops producing, then
    /// deletes the context and exits the loop. Safe to reach twice.
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.lifecycle.close();

        if let (Some(surface), Some(context)) = (self.surface.as_mut(), self.context.take()) {
            if let Err(err) = surface.delete_context(context) {
                log::warn!("context teardown failed: {}", err);
            }
        }
        self.surface = None;
        self.window = None;

        self.lifecycle.mark_closed();
        event_loop.exit();
    }

    fn refresh_title(&mut self) {
        let elapsed = self.title_refreshed.elapsed();
        if elapsed < TITLE_REFRESH {
            return;
        }
        let frames = self.presenter.frame_count();
        let fps = (frames - self.frames_at_refresh) as f64 / elapsed.as_secs_f64();
        if let Some(window) = self.window.as_ref() {
            window.set_title(&format!("emu-display | {:.0} FPS | frame {}", fps, frames));
        }
        self.title_refreshed = Instant::now();
        self.frames_at_refresh = frames;
    }

    fn poll_idle(&mut self) {
        if self.cursor.poll_idle(Instant::now()) {
            self.apply_cursor_state();
        }
    }
}

impl ApplicationHandler for DisplayWindow {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.lifecycle.is_closing() {
            return;
        }

        let scale = self.config.scale.clamp(1, 8);
        let window_attributes = Window::default_attributes()
            .with_title("emu-display")
            .with_inner_size(LogicalSize::new(BASE_WIDTH * scale, BASE_HEIGHT * scale));

        let window = event_loop
            .create_window(window_attributes)
            .expect("Failed to create window");

        // Wrap window in Arc for shared ownership with the surface
        let window = Arc::new(window);
        let window_size = window.inner_size();

        let surface_texture =
            SurfaceTexture::new(window_size.width, window_size.height, window.clone());
        let pixels = PixelsBuilder::new(BASE_WIDTH, BASE_HEIGHT, surface_texture)
            .enable_vsync(self.config.vsync)
            .build()
            .expect("Failed to create pixel buffer");

        let mut surface = PixelsSurface::new(pixels, (window_size.width, window_size.height));
        match surface.make_context() {
            Ok(context) => self.context = Some(context),
            Err(err) => {
                log::error!("context creation failed: {}", err);
                self.shutdown(event_loop);
                return;
            }
        }

        self.window = Some(window);
        self.surface = Some(surface);

        if self.config.fullscreen {
            self.toggle_fullscreen();
        } else {
            self.apply_cursor_state();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(size) => {
                if let Some(surface) = self.surface.as_mut() {
                    surface.resize_client(size.width, size.height);
                }
            }
            WindowEvent::Occluded(occluded) => {
                self.handle_occluded(occluded);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.handle_hotkey(event_loop, code);
            }
            WindowEvent::CursorMoved { .. } => {
                self.cursor.on_mouse_move(Instant::now());
                self.apply_cursor_state();
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                let now = Instant::now();
                let double = self
                    .last_click
                    .is_some_and(|prev| now.duration_since(prev) <= DOUBLE_CLICK_WINDOW);
                if double {
                    self.last_click = None;
                    self.cursor.on_double_click(now);
                    self.apply_cursor_state();
                } else {
                    self.last_click = Some(now);
                    self.cursor.on_mouse_move(now);
                }
            }
            WindowEvent::RedrawRequested => {
                if let (Some(surface), Some(context)) =
                    (self.surface.as_mut(), self.context.as_ref())
                {
                    // Skip drawing while minimized; frame bookkeeping still
                    // advances so producers keep their pacing
                    let skip = self.lifecycle.state() == WindowState::Minimized;
                    self.presenter.flip(surface, context, skip);
                }
                self.refresh_title();
                self.poll_idle();

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.poll_idle();

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Create the event loop and run the display window until it closes
pub fn run_display(mut display: DisplayWindow) -> Result<(), Box<dyn Error>> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run_app(&mut display)?;
    Ok(())
}
