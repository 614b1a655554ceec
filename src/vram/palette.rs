//! Palette upload
//!
//! The 256-color game palette lives in VRAM as two CLUT rows: one with the
//! STP bit set on every entry (black stays opaque) and one without it (black
//! entries read as transparent).

use crate::config::VramConfig;
use crate::gpu::{clut_code, rgb16, Gpu, Rect};

pub const PALETTE_COLORS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// VRAM position of the opaque row; the transparent row is just below
    pub origin: (u16, u16),
    pub clut: u16,
    pub clut_transparent: u16,
}

impl Palette {
    pub fn new(config: &VramConfig) -> Self {
        let (x, y) = (config.clut_x, config.clut_y);
        Self {
            origin: (x, y),
            clut: clut_code(x, y),
            clut_transparent: clut_code(x, y + 1),
        }
    }

    /// CLUT attribute for a texture
    pub fn clut_for(&self, has_alpha: bool) -> u16 {
        if has_alpha { self.clut_transparent } else { self.clut }
    }

    /// Build both CLUT rows from 768 bytes of RGB
    pub fn rows(rgb: &[u8]) -> (Vec<u16>, Vec<u16>) {
        let mut opaque = Vec::with_capacity(PALETTE_COLORS);
        let mut transparent = Vec::with_capacity(PALETTE_COLORS);
        for i in 0..PALETTE_COLORS {
            let c = rgb.get(i * 3..i * 3 + 3).unwrap_or(&[0, 0, 0][..]);
            opaque.push(rgb16(c[0], c[1], c[2], true));
            transparent.push(rgb16(c[0], c[1], c[2], false));
        }
        (opaque, transparent)
    }

    pub fn upload(&self, gpu: &mut dyn Gpu, rgb: &[u8]) {
        if rgb.len() < PALETTE_COLORS * 3 {
            log::warn!("palette has {} colors, padding with black", rgb.len() / 3);
        }
        let (opaque, transparent) = Self::rows(rgb);
        let (x, y) = self.origin;
        gpu.load_image(Rect::new(x, y, PALETTE_COLORS as u16, 1), &opaque);
        gpu.load_image(Rect::new(x, y + 1, PALETTE_COLORS as u16, 1), &transparent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::RecordingGpu;

    #[test]
    fn test_rows_and_codes() {
        let palette = Palette::new(&VramConfig::default());
        assert_eq!(palette.clut, 480 << 6);
        assert_eq!(palette.clut_transparent, 481 << 6);

        let mut rgb = vec![0u8; 768];
        rgb[3..6].copy_from_slice(&[255, 255, 255]);
        let (opaque, transparent) = Palette::rows(&rgb);
        assert_eq!(opaque[0], 0x8000);
        assert_eq!(transparent[0], 0);
        assert_eq!(opaque[1], 0xffff);
        assert_eq!(transparent[1], 0x7fff);
    }

    #[test]
    fn test_upload_targets_clut_rows() {
        let palette = Palette::new(&VramConfig::default());
        let mut gpu = RecordingGpu::new();
        palette.upload(&mut gpu, &[128; 768]);
        let images = gpu.images();
        assert_eq!(images[0].0, Rect::new(0, 480, 256, 1));
        assert_eq!(images[1].0, Rect::new(0, 481, 256, 1));
        assert_eq!(palette.clut_for(true), palette.clut_transparent);
    }
}
