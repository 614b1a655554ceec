//! VRAM texture management
//!
//! VRAM outside the framebuffers and CLUT rows is cut into fixed texture
//! pages. Textures are packed into pages with a guillotine first-fit and are
//! never freed; a handle stays valid for the life of the allocator.

mod allocator;
mod loader;
mod palette;
mod types;

pub use allocator::*;
pub use loader::*;
pub use palette::*;
pub use types::*;
