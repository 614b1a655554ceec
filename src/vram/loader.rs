//! Texture upload
//!
//! Turns 8-bit indexed images into packed VRAM textures: downscales what does
//! not fit a page, zeroes the transparent index, pads to the packed size and
//! copies the result to VRAM.

use crate::gpu::{Gpu, Rect};

use super::allocator::VramAllocator;
use super::types::{TextureId, TextureKey, VramError};

/// Palette index treated as see-through in alpha textures
pub const TRANSPARENT_INDEX: u8 = 0xff;

/// Textures larger than this in both directions are halved when mipmapped
const MIPMAP_MIN_SIZE: u16 = 32;

/// One request to `load_texture`
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    pub identifier: &'a str,
    pub width: u16,
    pub height: u16,
    /// One palette index per texel, row-major
    pub pixels: &'a [u8],
    /// Downscale medium-sized textures to save VRAM
    pub mipmap: bool,
    /// Index 0xFF is transparent
    pub alpha: bool,
}

impl<'a> TextureUpload<'a> {
    pub fn new(identifier: &'a str, width: u16, height: u16, pixels: &'a [u8]) -> Self {
        Self {
            identifier,
            width,
            height,
            pixels,
            mipmap: false,
            alpha: false,
        }
    }

    pub fn mipmap(mut self, mipmap: bool) -> Self {
        self.mipmap = mipmap;
        self
    }

    pub fn alpha(mut self, alpha: bool) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Integer divisor that makes a `width`×`height` image fit a page
fn downscale_divisor(width: u16, height: u16, page: (u16, u16), mipmap: bool) -> u16 {
    let (page_w, page_h) = page;
    if width > page_w || height > page_h {
        // Page width in VRAM units is half its texel width
        let mut div = (width / (page_w / 2)).max(height / page_h).max(1);
        while width / div > page_w || height / div > page_h {
            div += 1;
        }
        div
    } else if mipmap && width > MIPMAP_MIN_SIZE && height > MIPMAP_MIN_SIZE {
        2
    } else {
        1
    }
}

/// Nearest-neighbour subsample by `div`, zeroing the transparent index
fn prepare_pixels(upload: &TextureUpload<'_>, div: u16) -> (u16, u16, Vec<u8>) {
    let (w, h) = (upload.width as usize, upload.height as usize);
    let div = div as usize;
    let (new_w, new_h) = (w / div, h / div);

    let mut out = Vec::with_capacity(new_w * new_h);
    for y in 0..new_h {
        for x in 0..new_w {
            out.push(upload.pixels[y * div * w + x * div]);
        }
    }
    if upload.alpha {
        for texel in &mut out {
            if *texel == TRANSPARENT_INDEX {
                *texel = 0;
            }
        }
    }
    (new_w as u16, new_h as u16, out)
}

/// Pack texel pairs into VRAM words; rows and columns beyond the image are zero
fn to_vram_words(pixels: &[u8], width: u16, height: u16, rect: Rect) -> Vec<u16> {
    let (w, h) = (width as usize, height as usize);
    let mut words = Vec::with_capacity(rect.area() as usize);
    for y in 0..rect.h as usize {
        for x in 0..rect.w as usize {
            let texel = |tx: usize| {
                if y < h && tx < w {
                    pixels[y * w + tx] as u16
                } else {
                    0
                }
            };
            words.push(texel(x * 2) | texel(x * 2 + 1) << 8);
        }
    }
    words
}

impl VramAllocator {
    /// Load an indexed texture, reusing an earlier upload of the same
    /// identifier and size. `None` when it cannot be packed.
    pub fn load_texture(&mut self, gpu: &mut dyn Gpu, upload: &TextureUpload<'_>) -> Option<TextureId> {
        match self.try_load_texture(gpu, upload) {
            Ok(id) => Some(id),
            Err(err) => {
                log::warn!("failed to load texture \"{}\": {}", upload.identifier, err);
                None
            }
        }
    }

    pub fn try_load_texture(
        &mut self,
        gpu: &mut dyn Gpu,
        upload: &TextureUpload<'_>,
    ) -> Result<TextureId, VramError> {
        let key = TextureKey::new(upload.identifier, upload.width, upload.height);
        if let Some(id) = self.find_key(&key) {
            log::debug!("texture \"{}\" already loaded", upload.identifier);
            return Ok(id);
        }

        let expected = upload.width as usize * upload.height as usize;
        if upload.pixels.len() < expected {
            return Err(VramError::ShortPixels {
                width: upload.width,
                height: upload.height,
                expected,
                got: upload.pixels.len(),
            });
        }
        if upload.width == 0 || upload.height == 0 {
            return Err(VramError::Empty { width: upload.width, height: upload.height });
        }

        let div = downscale_divisor(upload.width, upload.height, self.page_texels(), upload.mipmap);
        let (width, height, pixels) = prepare_pixels(upload, div);
        if div > 1 {
            log::debug!(
                "scaling texture \"{}\" {}x{} down to {}x{} (div {})",
                upload.identifier,
                upload.width,
                upload.height,
                width,
                height,
                div
            );
        }

        let id = self.allocate(key, width, height)?;
        self.finish_load(id, div, upload.alpha);

        let Some(texture) = self.texture(id) else {
            return Err(VramError::OutOfSpace { width, height });
        };
        let rect = texture.vram_rect();
        gpu.load_image(rect, &to_vram_words(&pixels, width, height, rect));
        log::debug!(
            "texture \"{}\" loaded at {}x{} vram ({}, {})",
            upload.identifier,
            width,
            height,
            rect.x,
            rect.y
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VramConfig;
    use crate::gpu::recording::RecordingGpu;

    fn allocator() -> VramAllocator {
        VramAllocator::new(&VramConfig::default())
    }

    #[test]
    fn test_divisor() {
        let page = (256, 256);
        assert_eq!(downscale_divisor(64, 64, page, false), 1);
        assert_eq!(downscale_divisor(64, 64, page, true), 2);
        assert_eq!(downscale_divisor(32, 64, page, true), 1);
        assert_eq!(downscale_divisor(320, 200, page, false), 2);
        assert_eq!(downscale_divisor(100, 300, page, false), 2);
        assert_eq!(downscale_divisor(1024, 16, page, false), 8);
    }

    #[test]
    fn test_load_uploads_packed_rows() {
        let mut vram = allocator();
        let mut gpu = RecordingGpu::new();
        let pixels: Vec<u8> = (0..16u8).collect();
        let id = vram
            .load_texture(&mut gpu, &TextureUpload::new("tiny", 4, 4, &pixels))
            .unwrap();

        let tex = vram.texture(id).unwrap();
        assert_eq!(tex.scale, 1);
        let images = gpu.images();
        assert_eq!(images.len(), 1);
        let (rect, words) = images[0];
        assert_eq!(rect, tex.vram_rect());
        assert_eq!((rect.w, rect.h), (2, 4));
        assert_eq!(words[0], 0x0100);
        assert_eq!(words[1], 0x0302);
        assert_eq!(words[2], 0x0504);
    }

    #[test]
    fn test_cache_hit_skips_upload() {
        let mut vram = allocator();
        let mut gpu = RecordingGpu::new();
        let pixels = vec![1u8; 64 * 64];
        let upload = TextureUpload::new("wall", 64, 64, &pixels).mipmap(true);
        let a = vram.load_texture(&mut gpu, &upload).unwrap();
        let b = vram.load_texture(&mut gpu, &upload).unwrap();
        assert_eq!(a, b);
        assert_eq!(gpu.images().len(), 1);
        // Found by its original size even though it was halved
        assert_eq!(vram.find("wall", 64, 64), Some(a));
        let tex = vram.texture(a).unwrap();
        assert_eq!(tex.scale, 2);
        assert_eq!((tex.alloc_rect.w, tex.alloc_rect.h), (32, 32));
    }

    #[test]
    fn test_alpha_zeroes_transparent_index() {
        let mut vram = allocator();
        let mut gpu = RecordingGpu::new();
        let pixels = vec![0xff, 7, 0xff, 9];
        vram.load_texture(&mut gpu, &TextureUpload::new("sprite", 4, 1, &pixels).alpha(true))
            .unwrap();
        let (_, words) = gpu.images()[0];
        assert_eq!(words[0], 0x0700);
        assert_eq!(words[1], 0x0900);
        // Padded rows are zero
        assert!(words[2..].iter().all(|&w| w == 0));
    }

    #[test]
    fn test_oversize_is_downscaled() {
        let mut vram = allocator();
        let mut gpu = RecordingGpu::new();
        let pixels = vec![3u8; 320 * 200];
        let id = vram
            .load_texture(&mut gpu, &TextureUpload::new("conback", 320, 200, &pixels))
            .unwrap();
        let tex = vram.texture(id).unwrap();
        assert_eq!(tex.scale, 2);
        assert_eq!((tex.alloc_rect.w, tex.alloc_rect.h), (160, 100));
    }

    #[test]
    fn test_short_pixels_rejected() {
        let mut vram = allocator();
        let mut gpu = RecordingGpu::new();
        let pixels = vec![0u8; 10];
        assert!(vram.load_texture(&mut gpu, &TextureUpload::new("bad", 4, 4, &pixels)).is_none());
        assert!(gpu.images().is_empty());
    }
}
