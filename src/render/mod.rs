//! Ordering-table renderer
//!
//! Two frame buffers alternate between being recorded into and being drawn.
//! World primitives are bucketed by depth; 2D drawing goes to a small UI
//! table that is drawn on top.

mod frame;
mod ordering;
mod renderer;
mod ui;

pub use frame::*;
pub use ordering::*;
pub use renderer::*;
pub use ui::*;
