// Display surface abstraction
//
// Core presentation logic depends only on the FrameSurface trait, never on
// a concrete backend. The winit/pixels backend lives in window.rs; a
// headless backend here serves tests and off-screen use.

use super::frame::Frame;

/// Opaque handle to a native drawable resource
///
/// Required to perform a flip. Exactly one context may be alive per surface
/// at a time; contexts are created and destroyed in matching pairs and a
/// new one may be created after the previous one is deleted.
#[derive(Debug, PartialEq, Eq)]
pub struct DisplayContext {
    id: u64,
}

impl DisplayContext {
    /// Backend-assigned identifier for this context
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Errors surfaced by a display backend
#[derive(Debug)]
pub enum SurfaceError {
    /// A context is already alive; delete it before creating another
    ContextAlreadyAlive,
    /// The context does not belong to this surface or was already deleted
    UnknownContext(u64),
    /// The backend failed to draw the frame
    Draw(String),
}

impl std::fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceError::ContextAlreadyAlive => {
                write!(f, "a display context is already alive")
            }
            SurfaceError::UnknownContext(id) => {
                write!(f, "unknown or stale display context (id {})", id)
            }
            SurfaceError::Draw(msg) => write!(f, "draw failed: {}", msg),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// A native drawable plus its graphics context
///
/// Implementations are owned and driven by the single UI-affine thread;
/// none of these methods are called from the renderer thread.
pub trait FrameSurface {
    /// Create and exclusively own a new display context
    ///
    /// The caller must later pass the context to [`delete_context`]
    /// (`FrameSurface::delete_context`). At most one context may be alive.
    fn make_context(&mut self) -> Result<DisplayContext, SurfaceError>;

    /// Destroy a context previously returned by [`make_context`]
    /// (`FrameSurface::make_context`)
    fn delete_context(&mut self, context: DisplayContext) -> Result<(), SurfaceError>;

    /// Draw a frame to the drawable
    fn draw(&mut self, context: &DisplayContext, frame: &Frame) -> Result<(), SurfaceError>;

    /// Drawable width in pixels
    fn client_width(&self) -> u32;

    /// Drawable height in pixels
    fn client_height(&self) -> u32;
}

/// Tracks the single-alive-context invariant for a backend
///
/// Backends embed one of these so the pairing rules live in one place.
#[derive(Debug, Default)]
pub struct ContextSlot {
    next_id: u64,
    alive: Option<u64>,
}

impl ContextSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a context is currently alive
    pub fn is_alive(&self) -> bool {
        self.alive.is_some()
    }

    /// Allocate a context if none is alive
    pub fn make(&mut self) -> Result<DisplayContext, SurfaceError> {
        if self.alive.is_some() {
            debug_assert!(false, "make_context called with a context still alive");
            return Err(SurfaceError::ContextAlreadyAlive);
        }
        self.next_id += 1;
        self.alive = Some(self.next_id);
        Ok(DisplayContext { id: self.next_id })
    }

    /// Release a context, validating that it is the live one
    pub fn delete(&mut self, context: DisplayContext) -> Result<(), SurfaceError> {
        if self.alive != Some(context.id) {
            debug_assert!(false, "delete_context called with a stale context");
            return Err(SurfaceError::UnknownContext(context.id));
        }
        self.alive = None;
        Ok(())
    }
}

/// Surface backend with no native window
///
/// Records what was drawn instead of putting pixels on screen. Used by the
/// integration tests and useful for running the presenter off-screen.
#[derive(Debug)]
pub struct HeadlessSurface {
    contexts: ContextSlot,
    width: u32,
    height: u32,
    draws: u64,
    last_drawn: Option<(u32, u32)>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            contexts: ContextSlot::new(),
            width,
            height,
            draws: 0,
            last_drawn: None,
        }
    }

    /// Number of frames drawn so far
    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    /// Dimensions of the most recently drawn frame
    pub fn last_drawn(&self) -> Option<(u32, u32)> {
        self.last_drawn
    }
}

impl FrameSurface for HeadlessSurface {
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
        self.draws += 1;
        self.last_drawn = Some((frame.width(), frame.height()));
        Ok(())
    }

    fn client_width(&self) -> u32 {
        self.width
    }

    fn client_height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_lifecycle_is_reusable() {
        let mut surface = HeadlessSurface::new(640, 480);

        let ctx = surface.make_context().unwrap();
        surface.delete_context(ctx).unwrap();

        // Paired lifecycle is reusable, not one-shot
        let ctx2 = surface.make_context().unwrap();
        surface.delete_context(ctx2).unwrap();
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic)]
    fn test_second_context_rejected_while_alive() {
        let mut surface = HeadlessSurface::new(640, 480);
        let _ctx = surface.make_context().unwrap();
        let result = surface.make_context();
        assert!(matches!(result, Err(SurfaceError::ContextAlreadyAlive)));
    }

    #[test]
    fn test_draw_records_frame() {
        let mut surface = HeadlessSurface::new(640, 480);
        let ctx = surface.make_context().unwrap();
        let frame = Frame::test_pattern(320, 240, 0);

        surface.draw(&ctx, &frame).unwrap();
        assert_eq!(surface.draw_count(), 1);
        assert_eq!(surface.last_drawn(), Some((320, 240)));

        surface.delete_context(ctx).unwrap();
    }

    #[test]
    fn test_context_ids_are_distinct() {
        let mut surface = HeadlessSurface::new(640, 480);
        let ctx = surface.make_context().unwrap();
        let first_id = ctx.id();
        surface.delete_context(ctx).unwrap();

        let ctx2 = surface.make_context().unwrap();
        assert_ne!(ctx2.id(), first_id);
        surface.delete_context(ctx2).unwrap();
    }
}
