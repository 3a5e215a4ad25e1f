// Display module - Frame presentation and window management
//
// This module provides:
// - Frame hand-off between the renderer thread and the display surface
// - Admission control (single in-flight frame, non-blocking queries)
// - Window lifecycle (open/close/fullscreen) coordinated with shutdown
// - A surface abstraction with winit/pixels and headless backends

pub mod frame;
pub mod lifecycle;
pub mod presenter;
pub mod surface;
pub mod window;

pub use frame::{Frame, FrameSizeMismatch, BYTES_PER_PIXEL};
pub use lifecycle::{FullscreenTransition, Geometry, WindowLifecycle, WindowState};
pub use presenter::FramePresenter;
pub use surface::{ContextSlot, DisplayContext, FrameSurface, HeadlessSurface, SurfaceError};
pub use window::{run_display, DisplayWindow, BASE_HEIGHT, BASE_WIDTH};
