//! psxq: the PlayStation rendering back-end of a Quake-era engine.
//!
//! The crate is organized leaf-first:
//! - `console`: command buffer, tokenizer and hash-sorted command/cvar registries
//! - `vram`: texture page packer, texture upload and palette/CLUT rows
//! - `gpu`: GPU register protocol, primitive packets and a software GPU
//! - `render`: double-buffered ordering tables and 2D UI drawing
//! - `geometry`: GTE transform, watermark scratch and recursive subdivision
//! - `cdrom`: sector-cached file handles over a CD drive
//! - `host`: wires the subsystems together for one frame loop

pub mod cdrom;
pub mod config;
pub mod console;
pub mod geometry;
pub mod gpu;
pub mod hash;
pub mod host;
pub mod render;
pub mod vram;

pub use config::EngineConfig;
pub use host::Host;

#[doc(hidden)]
pub use log as __log;

/// Unrecoverable engine condition: log at error level, then panic.
///
/// Reserved for states the engine cannot continue from (arena overflow,
/// CD read failure, ...). Everything else returns `Option`/`Result`.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        $crate::__log::error!("fatal: {}", msg);
        panic!("{}", msg)
    }};
}
