//! CD file emulation
//!
//! A synchronous file API over a sector-addressed drive. Each open file
//! keeps a one-sector cache and a (sector, byte) cursor; the handle pool is
//! small and fixed, as on the console.

pub mod drive;
pub mod files;
pub mod iso;
pub mod stream;

use thiserror::Error;

pub use drive::{CdDrive, DirEntry, DiscImage, SECTOR_SIZE};
pub use files::{normalize_path, CdFileSystem, FileHandle};
pub use iso::IsoImage;
pub use stream::CdStream;

#[derive(Debug, Error)]
pub enum CdError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("no free file handles")]
    NoFreeHandles,
    #[error("invalid file handle")]
    InvalidHandle,
    #[error("failed to read sector {lba}")]
    Read { lba: u32 },
    #[error("not an ISO9660 image: {0}")]
    Format(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
