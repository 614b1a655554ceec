//! GPU register protocol
//!
//! Everything the renderer needs from the graphics chip goes through the
//! [`Gpu`] trait: GP1 control words, GP0 packets, VRAM uploads and the two
//! blocking sync points. [`SoftGpu`] implements it in software.

mod env;
mod primitive;
mod soft;

#[cfg(test)]
pub(crate) mod recording;

pub use env::*;
pub use primitive::*;
pub use soft::*;

use serde::{Deserialize, Serialize};

/// VRAM width in 16-bit units
pub const VRAM_WIDTH: usize = 1024;
/// VRAM height in lines
pub const VRAM_HEIGHT: usize = 512;

/// Rectangle in VRAM units (or texels, depending on context)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, w: u16, h: u16) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> u32 {
        self.x as u32 + self.w as u32
    }

    pub fn bottom(&self) -> u32 {
        self.y as u32 + self.h as u32
    }

    pub fn area(&self) -> u32 {
        self.w as u32 * self.h as u32
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (self.x as u32) < other.right()
            && (other.x as u32) < self.right()
            && (self.y as u32) < other.bottom()
            && (other.y as u32) < self.bottom()
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Hardware access used by the renderer and the texture loader.
pub trait Gpu {
    /// Write a GP1 control word
    fn write_gp1(&mut self, word: u32);

    /// Execute one GP0 packet (command word first, no tag)
    fn draw_packet(&mut self, words: &[u32]);

    /// Copy 16-bit pixels into a VRAM rectangle, row-major
    fn load_image(&mut self, rect: Rect, pixels: &[u16]);

    /// Block until the GPU is idle; returns the ticks spent waiting
    fn draw_sync(&mut self) -> u32;

    /// Block until the next vertical blank
    fn vsync(&mut self);
}

impl<G: Gpu + ?Sized> Gpu for &mut G {
    fn write_gp1(&mut self, word: u32) {
        (**self).write_gp1(word)
    }

    fn draw_packet(&mut self, words: &[u32]) {
        (**self).draw_packet(words)
    }

    fn load_image(&mut self, rect: Rect, pixels: &[u16]) {
        (**self).load_image(rect, pixels)
    }

    fn draw_sync(&mut self) -> u32 {
        (**self).draw_sync()
    }

    fn vsync(&mut self) {
        (**self).vsync()
    }
}

/// 24-bit color as carried in primitive command words
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    /// Texture modulation neutral: texels are drawn unchanged
    pub const NEUTRAL: Rgb = Rgb::new(128, 128, 128);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_word(self) -> u32 {
        (self.b as u32) << 16 | (self.g as u32) << 8 | self.r as u32
    }

    pub fn from_word(word: u32) -> Self {
        Self::new(word as u8, (word >> 8) as u8, (word >> 16) as u8)
    }
}

/// Pack an 8-bit RGB color into a 15-bit VRAM pixel with the STP bit
pub fn rgb16(r: u8, g: u8, b: u8, stp: bool) -> u16 {
    (stp as u16) << 15 | (r >> 3) as u16 | ((g >> 3) as u16) << 5 | ((b >> 3) as u16) << 10
}

/// Texture page attribute: color depth mode, blend mode and page origin
pub fn tpage_code(mode: u16, abr: u16, x: u16, y: u16) -> u16 {
    (mode & 3) << 7 | (abr & 3) << 5 | (y & 0x100) >> 4 | (x & 0x3ff) >> 6 | (y & 0x200) << 2
}

/// CLUT attribute for a palette at `(x, y)`; x must be 16-aligned
pub fn clut_code(x: u16, y: u16) -> u16 {
    y << 6 | x >> 4
}

/// Texture color depth as encoded in the tpage mode bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexDepth {
    Clut4 = 0,
    Clut8 = 1,
    Direct15 = 2,
}
