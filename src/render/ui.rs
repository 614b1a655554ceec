//! 2D drawing: console text, pictures and screen effects
//!
//! Everything here goes into the UI ordering table, which is submitted after
//! the world. Within it, layers are drawn back-to-front:
//! BACKGROUND, IMAGES, MENU, TEXT.

use crate::gpu::{DrTpage, Point, PolyF4, PolyFt4, Primitive, Rgb, Sprt8, Tile, Uv};
use crate::vram::{Palette, Texture, TextureId, VramAllocator};

use super::renderer::{Renderer, Table};

pub const MAX_CACHED_PICS: usize = 128;

/// Glyph size of the console charset
pub const CHAR_SIZE: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiLayer {
    Background = 0,
    Images = 1,
    Menu = 2,
    Text = 3,
}

impl UiLayer {
    /// Table depth; the chain is walked from the highest depth down, so the
    /// first layer gets the deepest slot
    pub fn depth(self, table_len: usize) -> i32 {
        table_len as i32 - 1 - self as i32
    }
}

/// A named picture: screen size plus the texture it samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pic {
    pub name: String,
    pub width: u16,
    pub height: u16,
    pub texture: TextureId,
}

/// Pictures loaded by name, bounded like the menu cache
#[derive(Debug, Default)]
pub struct PicCache {
    pics: Vec<Pic>,
}

impl PicCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pics.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Pic> {
        self.pics.iter().find(|pic| pic.name == name)
    }

    /// Cache a picture, or return the one already cached under `name`
    pub fn insert(&mut self, name: &str, width: u16, height: u16, texture: TextureId) -> Option<&Pic> {
        if let Some(i) = self.pics.iter().position(|pic| pic.name == name) {
            return self.pics.get(i);
        }
        if self.pics.len() >= MAX_CACHED_PICS {
            log::warn!("pic cache full ({}), not caching {}", MAX_CACHED_PICS, name);
            return None;
        }
        self.pics.push(Pic {
            name: name.to_string(),
            width,
            height,
            texture,
        });
        self.pics.last()
    }
}

fn rect_points(x: i32, y: i32, w: i32, h: i32) -> [Point; 4] {
    let (x0, y0) = (x as i16, y as i16);
    let (x1, y1) = ((x + w) as i16, (y + h) as i16);
    [Point::new(x0, y0), Point::new(x1, y0), Point::new(x0, y1), Point::new(x1, y1)]
}

fn texture_uvs(texture: &Texture) -> [Uv; 4] {
    let r = texture.rect;
    let (u0, v0) = (r.x as u8, r.y as u8);
    let (u1, v1) = ((r.x + r.w) as u8, (r.y + r.h) as u8);
    [Uv::new(u0, v0), Uv::new(u1, v0), Uv::new(u0, v1), Uv::new(u1, v1)]
}

pub struct Draw2d {
    pub palette: Palette,
    /// 128×128 sheet of 16×16 glyphs
    pub charset: Option<TextureId>,
    /// Console background picture
    pub conback: Option<TextureId>,
    pub pics: PicCache,
    pub screen_width: u16,
    pub screen_height: u16,
}

impl Draw2d {
    pub fn new(palette: Palette, screen_width: u16, screen_height: u16) -> Self {
        Self {
            palette,
            charset: None,
            conback: None,
            pics: PicCache::new(),
            screen_width,
            screen_height,
        }
    }

    fn insert(r: &mut Renderer, layer: UiLayer, prim: &impl Primitive) {
        let depth = layer.depth(r.ui_ot_len());
        r.insert(Table::Ui, prim, depth);
    }

    fn glyph(&self, r: &mut Renderer, charset: &Texture, x: i32, y: i32, num: u8) {
        if num == b' ' || y <= -CHAR_SIZE {
            return;
        }
        let row = (num >> 4) as u16;
        let col = (num & 15) as u16;
        let sprite = Sprt8 {
            color: Rgb::NEUTRAL,
            xy: Point::new(x as i16, y as i16),
            uv: Uv::new(
                (charset.rect.x + col * 8) as u8,
                (charset.rect.y + row * 8) as u8,
            ),
            clut: self.palette.clut_transparent,
        };
        // Same slot: the tpage change links in front of the sprite
        Self::insert(r, UiLayer::Text, &sprite);
        let tpage = DrTpage {
            tpage: charset.tpage,
            dither: false,
            draw_on_display: true,
        };
        Self::insert(r, UiLayer::Text, &tpage);
    }

    /// One 8×8 console character; space and rows fully above the screen are skipped
    pub fn draw_character(&self, r: &mut Renderer, vram: &VramAllocator, x: i32, y: i32, num: u8) {
        let Some(charset) = self.charset.and_then(|id| vram.texture(id)) else {
            return;
        };
        self.glyph(r, charset, x, y, num);
    }

    pub fn draw_string(&self, r: &mut Renderer, vram: &VramAllocator, x: i32, y: i32, text: &str) {
        let Some(charset) = self.charset.and_then(|id| vram.texture(id)) else {
            return;
        };
        for (i, byte) in text.bytes().enumerate() {
            self.glyph(r, charset, x + i as i32 * CHAR_SIZE, y, byte);
        }
    }

    fn textured_rect(
        &self,
        r: &mut Renderer,
        layer: UiLayer,
        texture: &Texture,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
    ) {
        let quad = PolyFt4 {
            color: Rgb::NEUTRAL,
            xy: rect_points(x, y, w, h),
            uv: texture_uvs(texture),
            clut: self.palette.clut_for(texture.has_alpha),
            tpage: texture.tpage,
            semi_trans: false,
        };
        Self::insert(r, layer, &quad);
    }

    fn pic_texture<'a>(vram: &'a VramAllocator, pic: &Pic) -> &'a Texture {
        match vram.texture(pic.texture) {
            Some(texture) => texture,
            None => crate::fatal!("draw_pic: no texture for {}", pic.name),
        }
    }

    pub fn draw_pic(&self, r: &mut Renderer, vram: &VramAllocator, x: i32, y: i32, pic: &Pic) {
        let texture = Self::pic_texture(vram, pic);
        self.textured_rect(r, UiLayer::Images, texture, x, y, pic.width as i32, pic.height as i32);
    }

    /// Picture drawn over the menu layer
    pub fn draw_trans_pic(&self, r: &mut Renderer, vram: &VramAllocator, x: i32, y: i32, pic: &Pic) {
        let texture = Self::pic_texture(vram, pic);
        self.textured_rect(r, UiLayer::Menu, texture, x, y, pic.width as i32, pic.height as i32);
    }

    /// Disc activity icon in the top-right corner
    pub fn draw_disc(&self, r: &mut Renderer, vram: &VramAllocator) {
        if let Some(pic) = self.pics.get("disc") {
            self.draw_pic(r, vram, self.screen_width as i32 - 24, 0, pic);
        }
    }

    /// Console background pulled down to `lines`
    pub fn draw_console_background(&self, r: &mut Renderer, vram: &VramAllocator, lines: i32) {
        let (w, h) = (self.screen_width as i32, self.screen_height as i32);
        match self.conback.and_then(|id| vram.texture(id)) {
            Some(texture) => self.textured_rect(r, UiLayer::Background, texture, 0, lines - h, w, h),
            None => {
                let tile = Tile {
                    color: Rgb::new(0, 0, 32),
                    xy: Point::new(0, 0),
                    w: w as u16,
                    h: lines.clamp(0, h) as u16,
                    semi_trans: false,
                };
                Self::insert(r, UiLayer::Background, &tile);
            }
        }
    }

    pub fn draw_fill(&self, r: &mut Renderer, x: i32, y: i32, w: u16, h: u16, color: Rgb) {
        let tile = Tile {
            color,
            xy: Point::new(x as i16, y as i16),
            w,
            h,
            semi_trans: false,
        };
        Self::insert(r, UiLayer::Menu, &tile);
    }

    /// Darken everything behind the menu
    pub fn fade_screen(&self, r: &mut Renderer) {
        let quad = PolyF4 {
            color: Rgb::new(0, 0, 0),
            xy: rect_points(0, 0, self.screen_width as i32, self.screen_height as i32),
            semi_trans: true,
        };
        Self::insert(r, UiLayer::Background, &quad);
    }
}
