use thiserror::Error;

use crate::gpu::Rect;
use crate::hash::name_hash;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VramError {
    #[error("no texture page has room for {width}x{height}")]
    OutOfSpace { width: u16, height: u16 },
    #[error("texture {width}x{height} is larger than a page ({page_width}x{page_height})")]
    TooLarge {
        width: u16,
        height: u16,
        page_width: u16,
        page_height: u16,
    },
    #[error("texture has no area ({width}x{height})")]
    Empty { width: u16, height: u16 },
    #[error("pixel buffer holds {got} bytes, {width}x{height} needs {expected}")]
    ShortPixels {
        width: u16,
        height: u16,
        expected: usize,
        got: usize,
    },
}

/// Stable handle to a packed texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u16);

impl TextureId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Cache key: identifier hash plus the dimensions the caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureKey {
    pub hash: u32,
    pub width: u16,
    pub height: u16,
}

impl TextureKey {
    pub fn new(identifier: &str, width: u16, height: u16) -> Self {
        Self {
            hash: name_hash(identifier),
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub id: TextureId,
    pub key: TextureKey,
    /// Page index and its VRAM origin
    pub page: usize,
    pub page_origin: (u16, u16),
    /// Region reserved in the page, texels
    pub alloc_rect: Rect,
    /// Usable region in texels; clamped so UVs fit in a byte
    pub rect: Rect,
    /// Integer downscale applied at load
    pub scale: u16,
    pub has_alpha: bool,
    pub tpage: u16,
}

impl Texture {
    /// VRAM rectangle holding the texels; two 8-bit texels per VRAM unit
    pub fn vram_rect(&self) -> Rect {
        Rect::new(
            self.page_origin.0 + self.alloc_rect.x / 2,
            self.page_origin.1 + self.alloc_rect.y,
            self.alloc_rect.w / 2,
            self.alloc_rect.h,
        )
    }
}
