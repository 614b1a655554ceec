//! Software GPU
//!
//! A small GP0/GP1 interpreter drawing into a 1024×512 16-bit VRAM. It covers
//! the packets the renderer emits: flat and textured polygons (4/8/15-bit
//! textures), polylines, sprites, tiles, fills and draw-environment state.
//! Used by the viewer and by tests that want to look at pixels.

use std::path::Path;

use super::env::{DisplayMode, HorizontalRange, VerticalRange};
use super::primitive::{Point, LINE_TERMINATOR};
use super::{Gpu, Rect, Rgb, TexDepth, VRAM_HEIGHT, VRAM_WIDTH};

/// Pixels the software rasterizer counts as one draw-sync tick
const PIXELS_PER_TICK: u64 = 256;

fn vram_index(x: i32, y: i32) -> usize {
    ((y as usize) & (VRAM_HEIGHT - 1)) * VRAM_WIDTH + ((x as usize) & (VRAM_WIDTH - 1))
}

fn sign_extend_11(value: u32) -> i32 {
    ((value << 21) as i32) >> 21
}

/// Expand a 15-bit VRAM pixel to 8-bit channels
pub fn rgb555_to_rgb888(pixel: u16) -> [u8; 3] {
    let expand = |c: u16| {
        let c = (c & 0x1f) as u8;
        c << 3 | c >> 2
    };
    [expand(pixel), expand(pixel >> 5), expand(pixel >> 10)]
}

fn to_rgb555(c: [u8; 3]) -> u16 {
    (c[0] >> 3) as u16 | ((c[1] >> 3) as u16) << 5 | ((c[2] >> 3) as u16) << 10
}

/// Texture page state decoded from a tpage attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TexturePage {
    x_base: i32,
    y_base: i32,
    depth: TexDepth,
    abr: u8,
}

impl TexturePage {
    fn from_attr(attr: u16) -> Self {
        let depth = match (attr >> 7) & 3 {
            0 => TexDepth::Clut4,
            1 => TexDepth::Clut8,
            _ => TexDepth::Direct15,
        };
        Self {
            x_base: ((attr & 0xf) as i32) * 64,
            y_base: (((attr >> 4) & 1) as i32) * 256 + (((attr >> 11) & 1) as i32) * 512,
            depth,
            abr: ((attr >> 5) & 3) as u8,
        }
    }
}

/// Per-draw texture parameters
#[derive(Debug, Clone, Copy)]
struct TextureParams {
    page: TexturePage,
    clut_x: i32,
    clut_y: i32,
    raw: bool,
}

impl TextureParams {
    fn new(page: TexturePage, clut: u16, raw: bool) -> Self {
        Self {
            page,
            clut_x: ((clut & 0x3f) as i32) * 16,
            clut_y: ((clut >> 6) & 0x1ff) as i32,
            raw,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RasterVertex {
    x: i32,
    y: i32,
    color: Rgb,
    u: i32,
    v: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftGpuStats {
    pub packets: u64,
    pub pixels: u64,
    pub frames: u64,
    pub gp1_writes: u64,
}

pub struct SoftGpu {
    vram: Vec<u16>,
    display_enabled: bool,
    display_start: (u16, u16),
    h_range: HorizontalRange,
    v_range: VerticalRange,
    mode: DisplayMode,
    area_top_left: (i32, i32),
    area_bottom_right: (i32, i32),
    offset: (i32, i32),
    tex_page: TexturePage,
    pixels_since_sync: u64,
    pub stats: SoftGpuStats,
}

impl Default for SoftGpu {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftGpu {
    pub fn new() -> Self {
        Self {
            vram: vec![0; VRAM_WIDTH * VRAM_HEIGHT],
            display_enabled: false,
            display_start: (0, 0),
            h_range: HorizontalRange(0),
            v_range: VerticalRange(0),
            mode: DisplayMode(0),
            area_top_left: (0, 0),
            area_bottom_right: (VRAM_WIDTH as i32 - 1, VRAM_HEIGHT as i32 - 1),
            offset: (0, 0),
            tex_page: TexturePage::from_attr(0),
            pixels_since_sync: 0,
            stats: SoftGpuStats::default(),
        }
    }

    pub fn vram(&self) -> &[u16] {
        &self.vram
    }

    pub fn pixel(&self, x: u16, y: u16) -> u16 {
        self.vram[vram_index(x as i32, y as i32)]
    }

    pub fn display_enabled(&self) -> bool {
        self.display_enabled
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.mode
    }

    /// VRAM region currently scanned out
    pub fn display_area(&self) -> Rect {
        let width = match (self.mode.hres368(), self.mode.hres()) {
            (true, _) => 368,
            (false, 0) => 256,
            (false, 1) => 320,
            (false, 2) => 512,
            _ => 640,
        };
        let lines = self
            .v_range
            .end()
            .saturating_sub(self.v_range.start())
            .clamp(1, 256) as u16;
        let height = if self.mode.vres() { lines * 2 } else { lines };
        Rect::new(self.display_start.0, self.display_start.1, width, height)
    }

    /// RGBA8 copy of the displayed area
    pub fn display_rgba(&self) -> (Rect, Vec<u8>) {
        let area = self.display_area();
        let mut out = Vec::with_capacity(area.area() as usize * 4);
        for row in 0..area.h as i32 {
            let y = area.y as i32 + row;
            for col in 0..area.w as i32 {
                let rgb = if self.mode.rgb24() {
                    self.rgb24_pixel(area.x as i32, col, y)
                } else {
                    rgb555_to_rgb888(self.vram[vram_index(area.x as i32 + col, y)])
                };
                out.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
            }
        }
        (area, out)
    }

    fn rgb24_pixel(&self, x0: i32, col: i32, y: i32) -> [u8; 3] {
        let byte = |n: i32| {
            let word = self.vram[vram_index(x0 + n / 2, y)];
            if n % 2 == 0 { word as u8 } else { (word >> 8) as u8 }
        };
        [byte(col * 3), byte(col * 3 + 1), byte(col * 3 + 2)]
    }

    /// RGBA8 copy of the whole VRAM, 15-bit interpretation
    pub fn vram_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.vram.len() * 4);
        for &pixel in &self.vram {
            let rgb = rgb555_to_rgb888(pixel);
            out.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        out
    }

    pub fn save_vram_png<P: AsRef<Path>>(&self, path: P) -> image::ImageResult<()> {
        image::save_buffer(
            path,
            &self.vram_rgba(),
            VRAM_WIDTH as u32,
            VRAM_HEIGHT as u32,
            image::ColorType::Rgba8,
        )
    }

    fn reset(&mut self) {
        let vram = std::mem::take(&mut self.vram);
        let stats = self.stats;
        *self = Self { vram, stats, ..Self::new() };
    }

    fn vertex(&self, word: u32) -> (i32, i32) {
        let p = Point::from_word(word);
        (
            sign_extend_11(p.x as u16 as u32) + self.offset.0,
            sign_extend_11(p.y as u16 as u32) + self.offset.1,
        )
    }

    fn in_draw_area(&self, x: i32, y: i32) -> bool {
        x >= self.area_top_left.0
            && x <= self.area_bottom_right.0
            && y >= self.area_top_left.1
            && y <= self.area_bottom_right.1
    }

    fn put_pixel(&mut self, x: i32, y: i32, color: u16, semi_trans: bool, abr: u8) {
        if !self.in_draw_area(x, y) {
            return;
        }
        let index = vram_index(x, y);
        let pixel = if semi_trans {
            blend(self.vram[index], color, abr)
        } else {
            color
        };
        self.vram[index] = pixel;
        self.pixels_since_sync += 1;
        self.stats.pixels += 1;
    }

    fn sample_texture(&self, tex: &TextureParams, u: i32, v: i32) -> u16 {
        let u = u & 0xff;
        let v = v & 0xff;
        let page = &tex.page;
        let y = page.y_base + v;
        match page.depth {
            TexDepth::Clut4 => {
                let texel = self.vram[vram_index(page.x_base + u / 4, y)];
                let index = (texel >> ((u % 4) * 4)) & 0xf;
                self.vram[vram_index(tex.clut_x + index as i32, tex.clut_y)]
            }
            TexDepth::Clut8 => {
                let texel = self.vram[vram_index(page.x_base + u / 2, y)];
                let index = (texel >> ((u % 2) * 8)) & 0xff;
                self.vram[vram_index(tex.clut_x + index as i32, tex.clut_y)]
            }
            TexDepth::Direct15 => self.vram[vram_index(page.x_base + u, y)],
        }
    }

    /// Shade one fragment; `None` means the texel is transparent
    fn shade(
        &self,
        color: Rgb,
        tex: Option<&TextureParams>,
        u: i32,
        v: i32,
        semi_trans: bool,
    ) -> Option<(u16, bool)> {
        let Some(tex) = tex else {
            return Some((to_rgb555([color.r, color.g, color.b]), semi_trans));
        };
        let texel = self.sample_texture(tex, u, v);
        if texel == 0 {
            return None;
        }
        let stp = texel & 0x8000;
        let out = if tex.raw {
            texel & 0x7fff
        } else {
            let t = rgb555_to_rgb888(texel);
            let m = [color.r, color.g, color.b];
            let modulate = |i: usize| ((t[i] as u32 * m[i] as u32) >> 7).min(255) as u8;
            to_rgb555([modulate(0), modulate(1), modulate(2)])
        };
        Some((out | stp, semi_trans && stp != 0))
    }

    fn draw_triangle(
        &mut self,
        verts: [RasterVertex; 3],
        tex: Option<TextureParams>,
        gouraud: bool,
        semi_trans: bool,
    ) {
        let [mut a, mut b, c] = verts;
        let mut area = edge(a.x, a.y, b.x, b.y, c.x, c.y);
        if area == 0 {
            return;
        }
        if area < 0 {
            std::mem::swap(&mut a, &mut b);
            area = -area;
        }
        // Hardware refuses polygons spanning more than 1023×511
        let xs = [a.x, b.x, c.x];
        let ys = [a.y, b.y, c.y];
        let (min_x, max_x) = (xs.iter().min().copied().unwrap_or(0), xs.iter().max().copied().unwrap_or(0));
        let (min_y, max_y) = (ys.iter().min().copied().unwrap_or(0), ys.iter().max().copied().unwrap_or(0));
        if max_x - min_x >= 1024 || max_y - min_y >= 512 {
            return;
        }

        let min_x = min_x.max(self.area_top_left.0);
        let max_x = max_x.min(self.area_bottom_right.0);
        let min_y = min_y.max(self.area_top_left.1);
        let max_y = max_y.min(self.area_bottom_right.1);
        let abr = tex.map(|t| t.page.abr).unwrap_or(self.tex_page.abr);

        let bias = [
            if is_top_left(b, c) { 0 } else { -1 },
            if is_top_left(c, a) { 0 } else { -1 },
            if is_top_left(a, b) { 0 } else { -1 },
        ];

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let w0 = edge(b.x, b.y, c.x, c.y, x, y);
                let w1 = edge(c.x, c.y, a.x, a.y, x, y);
                let w2 = edge(a.x, a.y, b.x, b.y, x, y);
                if w0 + bias[0] < 0 || w1 + bias[1] < 0 || w2 + bias[2] < 0 {
                    continue;
                }
                let lerp = |p0: i32, p1: i32, p2: i32| {
                    ((p0 as i64 * w0 as i64 + p1 as i64 * w1 as i64 + p2 as i64 * w2 as i64)
                        / area as i64) as i32
                };
                let color = if gouraud {
                    Rgb::new(
                        lerp(a.color.r as i32, b.color.r as i32, c.color.r as i32) as u8,
                        lerp(a.color.g as i32, b.color.g as i32, c.color.g as i32) as u8,
                        lerp(a.color.b as i32, b.color.b as i32, c.color.b as i32) as u8,
                    )
                } else {
                    verts[0].color
                };
                let (u, v) = if tex.is_some() {
                    (lerp(a.u, b.u, c.u), lerp(a.v, b.v, c.v))
                } else {
                    (0, 0)
                };
                if let Some((pixel, blend)) = self.shade(color, tex.as_ref(), u, v, semi_trans) {
                    self.put_pixel(x, y, pixel, blend, abr);
                }
            }
        }
    }

    fn draw_polygon(&mut self, words: &[u32]) {
        let cmd = words[0] >> 24;
        let gouraud = cmd & 0x10 != 0;
        let quad = cmd & 0x08 != 0;
        let textured = cmd & 0x04 != 0;
        let semi_trans = cmd & 0x02 != 0;
        let raw = cmd & 0x01 != 0;

        let count = if quad { 4 } else { 3 };
        let needed = 1 + count * (1 + textured as usize) + if gouraud { count - 1 } else { 0 };
        if words.len() < needed {
            log::warn!("gp0: short polygon packet {:#04x} ({} words)", cmd, words.len());
            return;
        }

        let mut verts = [RasterVertex::default(); 4];
        let mut clut = 0u16;
        let mut tpage = None;
        let mut i = 1;
        for (n, vert) in verts.iter_mut().enumerate().take(count) {
            let color_word = if n > 0 && gouraud {
                i += 1;
                words[i - 1]
            } else {
                words[0]
            };
            let (x, y) = self.vertex(words[i]);
            i += 1;
            *vert = RasterVertex { x, y, color: Rgb::from_word(color_word), u: 0, v: 0 };
            if textured {
                let uv = words[i];
                i += 1;
                vert.u = (uv & 0xff) as i32;
                vert.v = ((uv >> 8) & 0xff) as i32;
                match n {
                    0 => clut = (uv >> 16) as u16,
                    1 => tpage = Some((uv >> 16) as u16),
                    _ => {}
                }
            }
        }

        let tex = if textured {
            if let Some(attr) = tpage {
                self.tex_page = TexturePage::from_attr(attr);
            }
            Some(TextureParams::new(self.tex_page, clut, raw))
        } else {
            None
        };

        self.draw_triangle([verts[0], verts[1], verts[2]], tex, gouraud, semi_trans);
        if quad {
            self.draw_triangle([verts[1], verts[2], verts[3]], tex, gouraud, semi_trans);
        }
    }

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgb, semi_trans: bool) {
        let pixel = to_rgb555([color.r, color.g, color.b]);
        let abr = self.tex_page.abr;
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put_pixel(x, y, pixel, semi_trans, abr);
            if x == to.0 && y == to.1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn draw_lines(&mut self, words: &[u32]) {
        let cmd = words[0] >> 24;
        let gouraud = cmd & 0x10 != 0;
        let polyline = cmd & 0x08 != 0;
        let semi_trans = cmd & 0x02 != 0;

        let mut points = Vec::new();
        let mut colors = Vec::new();
        let mut i = 1;
        let mut color = Rgb::from_word(words[0]);
        while i < words.len() {
            if !points.is_empty() {
                if words[i] & 0xf000_f000 == LINE_TERMINATOR & 0xf000_f000 {
                    break;
                }
                if gouraud {
                    color = Rgb::from_word(words[i]);
                    i += 1;
                    if i >= words.len() {
                        break;
                    }
                }
            }
            points.push(self.vertex(words[i]));
            colors.push(color);
            i += 1;
            if !polyline && points.len() == 2 {
                break;
            }
        }

        for (n, pair) in points.windows(2).enumerate() {
            self.draw_line(pair[0], pair[1], colors[n], semi_trans);
        }
    }

    fn draw_rect(&mut self, words: &[u32]) {
        let cmd = words[0] >> 24;
        let textured = cmd & 0x04 != 0;
        let semi_trans = cmd & 0x02 != 0;
        let raw = cmd & 0x01 != 0;
        let size = (cmd >> 3) & 3;

        let needed = 2 + textured as usize + (size == 0) as usize;
        if words.len() < needed {
            log::warn!("gp0: short rectangle packet {:#04x} ({} words)", cmd, words.len());
            return;
        }

        let color = Rgb::from_word(words[0]);
        let (x0, y0) = self.vertex(words[1]);
        let mut i = 2;
        let (mut u0, mut v0, mut clut) = (0, 0, 0);
        if textured {
            u0 = (words[i] & 0xff) as i32;
            v0 = ((words[i] >> 8) & 0xff) as i32;
            clut = (words[i] >> 16) as u16;
            i += 1;
        }
        let (w, h) = match size {
            0 => ((words[i] & 0x3ff) as i32, ((words[i] >> 16) & 0x1ff) as i32),
            1 => (1, 1),
            2 => (8, 8),
            _ => (16, 16),
        };

        let tex = textured.then(|| TextureParams::new(self.tex_page, clut, raw));
        let abr = self.tex_page.abr;
        for dy in 0..h {
            for dx in 0..w {
                if let Some((pixel, blend)) =
                    self.shade(color, tex.as_ref(), u0 + dx, v0 + dy, semi_trans)
                {
                    self.put_pixel(x0 + dx, y0 + dy, pixel, blend, abr);
                }
            }
        }
    }

    fn fill(&mut self, words: &[u32]) {
        if words.len() < 3 {
            log::warn!("gp0: short fill packet");
            return;
        }
        let color = Rgb::from_word(words[0]);
        let pixel = to_rgb555([color.r, color.g, color.b]);
        let x0 = (words[1] & 0x3f0) as i32;
        let y0 = ((words[1] >> 16) & 0x1ff) as i32;
        let w = (((words[2] & 0x3ff) + 0xf) & !0xf) as i32;
        let h = ((words[2] >> 16) & 0x1ff) as i32;
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                self.vram[vram_index(x, y)] = pixel;
            }
        }
        self.pixels_since_sync += (w * h) as u64;
        self.stats.pixels += (w * h) as u64;
    }
}

fn edge(ax: i32, ay: i32, bx: i32, by: i32, px: i32, py: i32) -> i32 {
    (bx - ax) * (py - ay) - (by - ay) * (px - ax)
}

fn is_top_left(a: RasterVertex, b: RasterVertex) -> bool {
    (a.y == b.y && b.x < a.x) || b.y > a.y
}

fn blend(background: u16, foreground: u16, abr: u8) -> u16 {
    let b = rgb555_to_rgb888(background);
    let f = rgb555_to_rgb888(foreground);
    let mix = |i: usize| -> u8 {
        let (b, f) = (b[i] as i32, f[i] as i32);
        let c = match abr {
            0 => (b + f) / 2,
            1 => b + f,
            2 => b - f,
            _ => b + f / 4,
        };
        c.clamp(0, 255) as u8
    };
    to_rgb555([mix(0), mix(1), mix(2)]) | (foreground & 0x8000)
}

impl Gpu for SoftGpu {
    fn write_gp1(&mut self, word: u32) {
        self.stats.gp1_writes += 1;
        match word >> 24 {
            0x00 => self.reset(),
            0x03 => self.display_enabled = word & 1 == 0,
            0x05 => {
                self.display_start = ((word & 0x3ff) as u16, ((word >> 10) & 0x1ff) as u16);
            }
            0x06 => self.h_range = HorizontalRange(word & 0xff_ffff),
            0x07 => self.v_range = VerticalRange(word & 0xf_ffff),
            0x08 => self.mode = DisplayMode(word & 0xff),
            other => log::trace!("gp1: ignoring command {:#04x}", other),
        }
    }

    fn draw_packet(&mut self, words: &[u32]) {
        let Some(&first) = words.first() else {
            return;
        };
        self.stats.packets += 1;
        match first >> 24 {
            0x00 => {}
            0x02 => self.fill(words),
            0x20..=0x3f => self.draw_polygon(words),
            0x40..=0x5f => self.draw_lines(words),
            0x60..=0x7f => self.draw_rect(words),
            // Dither (bit 9) is not emulated
            0xe1 => self.tex_page = TexturePage::from_attr((first & 0x9ff) as u16),
            0xe2 => {}
            0xe3 => {
                self.area_top_left = ((first & 0x3ff) as i32, ((first >> 10) & 0x3ff) as i32);
            }
            0xe4 => {
                self.area_bottom_right = ((first & 0x3ff) as i32, ((first >> 10) & 0x3ff) as i32);
            }
            0xe5 => {
                self.offset = (sign_extend_11(first & 0x7ff), sign_extend_11((first >> 11) & 0x7ff));
            }
            0xe6 => {}
            other => log::trace!("gp0: ignoring command {:#04x}", other),
        }
    }

    fn load_image(&mut self, rect: Rect, pixels: &[u16]) {
        let expected = rect.area() as usize;
        if pixels.len() < expected {
            log::warn!(
                "load_image: {} pixels supplied for a {}x{} rect",
                pixels.len(),
                rect.w,
                rect.h
            );
        }
        for (i, &pixel) in pixels.iter().take(expected).enumerate() {
            let x = rect.x as i32 + (i % rect.w as usize) as i32;
            let y = rect.y as i32 + (i / rect.w as usize) as i32;
            self.vram[vram_index(x, y)] = pixel;
        }
    }

    fn draw_sync(&mut self) -> u32 {
        let ticks = self.pixels_since_sync / PIXELS_PER_TICK;
        self.pixels_since_sync = 0;
        ticks.min(u32::MAX as u64) as u32
    }

    fn vsync(&mut self) {
        self.stats.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{
        clut_code, rgb16, tpage_code, DisplayEnv, DisplayEnvCache, DrawEnv, PolyF3, PolyFt4,
        Primitive, Sprt8, Tile, Uv,
    };

    fn gpu_with_area() -> SoftGpu {
        let mut gpu = SoftGpu::new();
        DrawEnv::new(0, 0, 320, 240).submit(&mut gpu);
        gpu
    }

    #[test]
    fn test_fill_and_display() {
        let mut gpu = SoftGpu::new();
        DisplayEnvCache::from_env(&DisplayEnv::new(0, 240, 320, 240)).submit(&mut gpu);
        gpu.write_gp1(crate::gpu::GP1_DISPLAY_ENABLE);

        let mut env = DrawEnv::new(0, 240, 320, 240);
        env.clear = true;
        env.color = Rgb::new(255, 0, 0);
        env.submit(&mut gpu);

        assert!(gpu.display_enabled());
        assert_eq!(gpu.display_area(), Rect::new(0, 240, 320, 240));
        assert_eq!(gpu.pixel(10, 250), 0x001f);
        assert_eq!(gpu.pixel(10, 10), 0);

        let (area, rgba) = gpu.display_rgba();
        assert_eq!(rgba.len(), area.area() as usize * 4);
        assert_eq!(&rgba[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_flat_triangle_covers_interior() {
        let mut gpu = gpu_with_area();
        let tri = PolyF3 {
            color: Rgb::WHITE,
            xy: [Point::new(10, 10), Point::new(100, 10), Point::new(10, 100)],
            semi_trans: false,
        };
        gpu.draw_packet(&tri.to_words());
        assert_eq!(gpu.pixel(20, 20), 0x7fff);
        assert_eq!(gpu.pixel(90, 90), 0);
        // Winding does not matter
        let tri = PolyF3 { xy: [tri.xy[0], tri.xy[2], tri.xy[1]], ..tri };
        gpu.draw_packet(&tri.to_words());
        assert_eq!(gpu.pixel(20, 20), 0x7fff);
    }

    #[test]
    fn test_draw_area_clips() {
        let mut gpu = SoftGpu::new();
        DrawEnv::new(0, 0, 16, 16).submit(&mut gpu);
        let tile = Tile { color: Rgb::WHITE, xy: Point::new(0, 0), w: 32, h: 32, semi_trans: false };
        gpu.draw_packet(&tile.to_words());
        assert_eq!(gpu.pixel(15, 15), 0x7fff);
        assert_eq!(gpu.pixel(16, 16), 0);
    }

    #[test]
    fn test_textured_quad_samples_clut() {
        let mut gpu = gpu_with_area();
        // CLUT: index 1 = red, index 2 = green
        let mut clut = vec![0u16; 256];
        clut[1] = rgb16(255, 0, 0, true);
        clut[2] = rgb16(0, 255, 0, true);
        gpu.load_image(Rect::new(0, 480, 256, 1), &clut);
        // 8-bit texture at page (640, 0): left half index 1, right half index 2
        let row: Vec<u16> = (0..8).map(|x| if x < 4 { 0x0101 } else { 0x0202 }).collect();
        let texels: Vec<u16> = row.iter().cycle().take(8 * 16).copied().collect();
        gpu.load_image(Rect::new(640, 0, 8, 16), &texels);

        let quad = PolyFt4 {
            color: Rgb::NEUTRAL,
            xy: [Point::new(0, 0), Point::new(16, 0), Point::new(0, 16), Point::new(16, 16)],
            uv: [Uv::new(0, 0), Uv::new(16, 0), Uv::new(0, 16), Uv::new(16, 16)],
            clut: clut_code(0, 480),
            tpage: tpage_code(TexDepth::Clut8 as u16, 0, 640, 0),
            semi_trans: false,
        };
        gpu.draw_packet(&quad.to_words());
        assert_eq!(gpu.pixel(2, 2) & 0x7fff, 0x001f);
        assert_eq!(gpu.pixel(12, 2) & 0x7fff, 0x03e0);
    }

    #[test]
    fn test_transparent_texel_skipped() {
        let mut gpu = gpu_with_area();
        gpu.load_image(Rect::new(0, 480, 256, 1), &[0u16; 256]);
        gpu.draw_packet(&[0xe100_0000 | tpage_code(1, 0, 640, 0) as u32]);
        gpu.load_image(Rect::new(0, 0, 8, 8), &[0x1234; 64]);
        let sprite = Sprt8 {
            color: Rgb::NEUTRAL,
            xy: Point::new(0, 0),
            uv: Uv::new(0, 0),
            clut: clut_code(0, 480),
        };
        gpu.draw_packet(&sprite.to_words());
        assert_eq!(gpu.pixel(1, 1), 0x1234);
    }

    #[test]
    fn test_semi_transparent_average() {
        let mut gpu = gpu_with_area();
        let white = Tile { color: Rgb::WHITE, xy: Point::new(0, 0), w: 4, h: 4, semi_trans: false };
        gpu.draw_packet(&white.to_words());
        let black = Tile { color: Rgb::new(0, 0, 0), semi_trans: true, ..white };
        gpu.draw_packet(&black.to_words());
        let rgb = rgb555_to_rgb888(gpu.pixel(1, 1));
        assert!(rgb[0] > 100 && rgb[0] < 140, "got {:?}", rgb);
    }

    #[test]
    fn test_polyline() {
        let mut gpu = gpu_with_area();
        let line = crate::gpu::LineF3 {
            color: Rgb::WHITE,
            xy: [Point::new(0, 0), Point::new(10, 0), Point::new(10, 10)],
        };
        gpu.draw_packet(&line.to_words());
        assert_eq!(gpu.pixel(5, 0), 0x7fff);
        assert_eq!(gpu.pixel(10, 5), 0x7fff);
        assert_eq!(gpu.pixel(5, 5), 0);
    }

    #[test]
    fn test_draw_sync_counts_pixels() {
        let mut gpu = gpu_with_area();
        let tile = Tile { color: Rgb::WHITE, xy: Point::new(0, 0), w: 64, h: 64, semi_trans: false };
        gpu.draw_packet(&tile.to_words());
        assert_eq!(gpu.draw_sync(), (64 * 64 / PIXELS_PER_TICK) as u32);
        assert_eq!(gpu.draw_sync(), 0);
        gpu.vsync();
        assert_eq!(gpu.stats.frames, 1);
    }

    #[test]
    fn test_save_vram_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vram.png");
        let gpu = SoftGpu::new();
        gpu.save_vram_png(&path).unwrap();
        assert!(path.exists());
    }
}
