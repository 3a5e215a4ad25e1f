// Input module - Pointer visibility and lock handling
//
// Keyboard hotkeys are handled directly by the window backend; this module
// owns the cursor state machine driven by pointer and window events.

pub mod cursor;

pub use cursor::{CursorSettings, CursorState, InputCursorController};
