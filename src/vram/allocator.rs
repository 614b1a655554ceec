//! Texture page packer
//!
//! Each page keeps a list of free rectangles in texel space. A request takes
//! the first free rectangle that fits and splits the remainder guillotine
//! style into a right strip and a bottom strip. Nothing is ever freed or
//! merged.

use crate::config::VramConfig;
use crate::gpu::{tpage_code, Rect, TexDepth, VRAM_HEIGHT, VRAM_WIDTH};

use super::types::{Texture, TextureId, TextureKey, VramError};

/// Largest texel coordinate a UV byte can address
const UV_LIMIT: u16 = u8::MAX as u16;

pub struct TexturePage {
    pub index: usize,
    /// VRAM origin in 16-bit units
    pub origin: (u16, u16),
    textures: Vec<TextureId>,
    free: Vec<Rect>,
}

impl TexturePage {
    fn new(index: usize, origin: (u16, u16), texels: (u16, u16)) -> Self {
        Self {
            index,
            origin,
            textures: Vec::new(),
            free: vec![Rect::new(0, 0, texels.0, texels.1)],
        }
    }

    pub fn textures(&self) -> &[TextureId] {
        &self.textures
    }

    pub fn free_rects(&self) -> &[Rect] {
        &self.free
    }

    pub fn free_area(&self) -> u32 {
        self.free.iter().map(Rect::area).sum()
    }

    /// Carve `w`×`h` out of the first free rect that fits
    fn take(&mut self, w: u16, h: u16) -> Option<Rect> {
        let i = self.free.iter().position(|r| r.w >= w && r.h >= h)?;
        let fit = self.free.remove(i);

        let right = Rect::new(fit.x + w, fit.y, fit.w - w, h);
        let bottom = Rect::new(fit.x, fit.y + h, fit.w, fit.h - h);
        let mut at = i;
        for strip in [right, bottom] {
            if !strip.is_empty() {
                self.free.insert(at, strip);
                at += 1;
            }
        }
        Some(Rect::new(fit.x, fit.y, w, h))
    }
}

pub struct VramAllocator {
    pages: Vec<TexturePage>,
    textures: Vec<Texture>,
    /// Page size in 8-bit texels
    page_texels: (u16, u16),
    /// Bookkeeping limit per page for free rects and for textures
    rects_per_page: usize,
}

impl VramAllocator {
    /// Lay out every page that does not touch a reserved region
    pub fn new(config: &VramConfig) -> Self {
        let (pw, ph) = (config.page_width, config.page_height);
        let mut pages = Vec::new();
        for y in (0..VRAM_HEIGHT as u16).step_by(ph as usize) {
            for x in (0..VRAM_WIDTH as u16).step_by(pw as usize) {
                let area = Rect::new(x, y, pw, ph);
                if config.reserved.iter().any(|r| r.intersects(&area)) {
                    continue;
                }
                if area.right() > VRAM_WIDTH as u32 || area.bottom() > VRAM_HEIGHT as u32 {
                    continue;
                }
                pages.push(TexturePage::new(pages.len(), (x, y), (pw * 2, ph)));
            }
        }

        let rects_per_page = config.max_rects / pages.len().max(1);
        log::debug!(
            "vram: {} texture pages of {}x{}, {} rects each",
            pages.len(),
            pw,
            ph,
            rects_per_page
        );

        Self {
            pages,
            textures: Vec::new(),
            page_texels: (pw * 2, ph),
            rects_per_page,
        }
    }

    pub fn pages(&self) -> &[TexturePage] {
        &self.pages
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.index())
    }

    /// Page size in texels
    pub fn page_texels(&self) -> (u16, u16) {
        self.page_texels
    }

    pub fn free_area(&self) -> u32 {
        self.pages.iter().map(TexturePage::free_area).sum()
    }

    pub fn find(&self, identifier: &str, width: u16, height: u16) -> Option<TextureId> {
        self.find_key(&TextureKey::new(identifier, width, height))
    }

    pub fn find_key(&self, key: &TextureKey) -> Option<TextureId> {
        self.textures.iter().find(|t| t.key == *key).map(|t| t.id)
    }

    /// Reserve room for a `width`×`height` 8-bit texture. Asking again for the
    /// same identifier and size returns the existing handle.
    pub fn pack(&mut self, identifier: &str, width: u16, height: u16) -> Result<TextureId, VramError> {
        let key = TextureKey::new(identifier, width, height);
        if let Some(id) = self.find_key(&key) {
            return Ok(id);
        }
        self.allocate(key, width, height)
    }

    /// Reserve room under `key`; the packed size may differ from the key's
    /// (downscaled textures stay addressable by their original size).
    pub(crate) fn allocate(&mut self, key: TextureKey, width: u16, height: u16) -> Result<TextureId, VramError> {
        if width == 0 || height == 0 {
            return Err(VramError::Empty { width, height });
        }
        // Two texels per VRAM unit; transfers want whole rows of 4
        let w = width.saturating_add(1) & !1;
        let h = height.saturating_add(3) & !3;
        if w > self.page_texels.0 || h > self.page_texels.1 {
            return Err(VramError::TooLarge {
                width,
                height,
                page_width: self.page_texels.0,
                page_height: self.page_texels.1,
            });
        }
        let id = TextureId(self.textures.len() as u16);

        let limit = self.rects_per_page;
        for page in &mut self.pages {
            // A split can add one net free rect
            if page.textures.len() >= limit || page.free.len() + 1 > limit {
                continue;
            }
            let Some(alloc_rect) = page.take(w, h) else {
                continue;
            };
            page.textures.push(id);

            let texture = Texture {
                id,
                key,
                page: page.index,
                page_origin: page.origin,
                alloc_rect,
                rect: clamp_uv_rect(alloc_rect),
                scale: 1,
                has_alpha: false,
                tpage: tpage_code(TexDepth::Clut8 as u16, 0, page.origin.0, page.origin.1),
            };
            log::debug!(
                "vram: packed {}x{} into page {} at ({}, {})",
                w,
                h,
                page.index,
                alloc_rect.x,
                alloc_rect.y
            );
            self.textures.push(texture);
            return Ok(id);
        }

        Err(VramError::OutOfSpace { width, height })
    }

    /// Record load-time attributes; only called before the handle escapes
    pub(crate) fn finish_load(&mut self, id: TextureId, scale: u16, has_alpha: bool) {
        if let Some(texture) = self.textures.get_mut(id.index()) {
            texture.scale = scale;
            texture.has_alpha = has_alpha;
        }
    }
}

/// Keep `x + w` and `y + h` addressable by a UV byte
fn clamp_uv_rect(rect: Rect) -> Rect {
    let mut rect = rect;
    if rect.x + rect.w >= UV_LIMIT {
        rect.w = UV_LIMIT.saturating_sub(rect.x);
    }
    if rect.y + rect.h >= UV_LIMIT {
        rect.h = UV_LIMIT.saturating_sub(rect.y);
    }
    rect
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator() -> VramAllocator {
        VramAllocator::new(&VramConfig::default())
    }

    #[test]
    fn test_pages_avoid_reserved_regions() {
        let vram = allocator();
        assert_eq!(vram.pages().len(), 10);
        let config = VramConfig::default();
        for page in vram.pages() {
            let area = Rect::new(page.origin.0, page.origin.1, 128, 256);
            assert!(config.reserved.iter().all(|r| !r.intersects(&area)));
        }
        assert_eq!(vram.page_texels(), (256, 256));
    }

    #[test]
    fn test_pack_is_idempotent() {
        let mut vram = allocator();
        let a = vram.pack("wall", 64, 64).unwrap();
        let b = vram.pack("wall", 64, 64).unwrap();
        assert_eq!(a, b);
        assert_eq!(vram.textures().len(), 1);
        // Same identifier, different size is a different texture
        let c = vram.pack("wall", 32, 32).unwrap();
        assert_ne!(a, c);
        assert_eq!(vram.find("wall", 32, 32), Some(c));
        assert_eq!(vram.find("floor", 64, 64), None);
    }

    #[test]
    fn test_packed_rects_are_disjoint() {
        let mut vram = allocator();
        let sizes = [(64, 64), (200, 30), (16, 16), (130, 250), (48, 100), (256, 12), (8, 8)];
        let mut ids = Vec::new();
        for round in 0..6 {
            for (i, &(w, h)) in sizes.iter().enumerate() {
                if let Ok(id) = vram.pack(&format!("tex{}_{}", round, i), w, h) {
                    ids.push(id);
                }
            }
        }
        let textures: Vec<_> = ids.iter().filter_map(|&id| vram.texture(id)).collect();
        for (i, a) in textures.iter().enumerate() {
            assert!(a.alloc_rect.right() <= 256 && a.alloc_rect.bottom() <= 256);
            for b in &textures[i + 1..] {
                if a.page == b.page {
                    assert!(!a.alloc_rect.intersects(&b.alloc_rect), "{:?} overlaps {:?}", a, b);
                }
            }
        }
        // Free space never overlaps allocations
        for page in vram.pages() {
            for free in page.free_rects() {
                for &id in page.textures() {
                    let tex = vram.texture(id).unwrap();
                    assert!(!free.intersects(&tex.alloc_rect));
                }
            }
        }
    }

    #[test]
    fn test_accounting_never_exceeds_capacity() {
        let mut vram = allocator();
        let capacity = vram.free_area();
        let mut used = 0;
        for i in 0.. {
            match vram.pack(&format!("t{}", i), 96, 72) {
                Ok(id) => used += vram.texture(id).unwrap().alloc_rect.area(),
                Err(_) => break,
            }
        }
        assert_eq!(used + vram.free_area(), capacity);
    }

    #[test]
    fn test_page_exhaustion_64x64() {
        // One page holds exactly 16 textures of 64x64 texels
        let config = VramConfig {
            reserved: vec![Rect::new(0, 0, 1024, 256), Rect::new(128, 256, 896, 256)],
            ..VramConfig::default()
        };
        let mut vram = VramAllocator::new(&config);
        assert_eq!(vram.pages().len(), 1);
        for i in 0..16 {
            vram.pack(&format!("t{}", i), 64, 64).unwrap();
        }
        assert_eq!(vram.free_area(), 0);
        let err = vram.pack("one-too-many", 64, 64).unwrap_err();
        assert_eq!(err, VramError::OutOfSpace { width: 64, height: 64 });
    }

    #[test]
    fn test_height_rounds_up_to_four() {
        let mut vram = allocator();
        let id = vram.pack("odd", 33, 13).unwrap();
        let tex = vram.texture(id).unwrap();
        assert_eq!((tex.alloc_rect.w, tex.alloc_rect.h), (34, 16));
        assert_eq!(tex.vram_rect().w, 17);
    }

    #[test]
    fn test_rect_clamped_to_uv_range() {
        let mut vram = allocator();
        let id = vram.pack("full", 256, 256).unwrap();
        let tex = vram.texture(id).unwrap();
        assert_eq!(tex.alloc_rect, Rect::new(0, 0, 256, 256));
        assert_eq!(tex.rect, Rect::new(0, 0, 255, 255));
    }

    #[test]
    fn test_rejects_oversize_and_empty() {
        let mut vram = allocator();
        assert!(matches!(vram.pack("big", 512, 16), Err(VramError::TooLarge { .. })));
        assert!(matches!(vram.pack("none", 0, 16), Err(VramError::Empty { .. })));
    }

    #[test]
    fn test_tpage_matches_page_origin() {
        let mut vram = allocator();
        let id = vram.pack("a", 16, 16).unwrap();
        let tex = vram.texture(id).unwrap();
        assert_eq!(tex.tpage, tpage_code(1, 0, tex.page_origin.0, tex.page_origin.1));
        assert_eq!(tex.page_origin, vram.pages()[0].origin);
    }
}
