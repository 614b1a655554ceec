//! GP0 primitive packets
//!
//! Each primitive knows its payload length and how to lay itself out as GP0
//! words. The ordering table stores the payload behind a tag word; the tag is
//! not part of the packet.

use bytemuck::{Pod, Zeroable};

use super::Rgb;

const CMD_SEMI_TRANS: u32 = 0x0200_0000;
/// Polyline terminator
pub const LINE_TERMINATOR: u32 = 0x5555_5555;

/// Screen-space vertex
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    pub fn to_word(self) -> u32 {
        (self.y as u16 as u32) << 16 | self.x as u16 as u32
    }

    pub fn from_word(word: u32) -> Self {
        Self::new(word as u16 as i16, (word >> 16) as u16 as i16)
    }
}

/// Texture coordinate inside a texture page
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Uv {
    pub u: u8,
    pub v: u8,
}

impl Uv {
    pub const fn new(u: u8, v: u8) -> Self {
        Self { u, v }
    }

    fn to_word(self, attr: u16) -> u32 {
        (attr as u32) << 16 | (self.v as u32) << 8 | self.u as u32
    }
}

/// A GP0 packet that can be linked into an ordering table.
pub trait Primitive {
    /// Payload length in words
    const WORDS: usize;

    /// Write exactly `WORDS` words into `out`
    fn write(&self, out: &mut [u32]);

    fn to_words(&self) -> Vec<u32> {
        let mut words = vec![0; Self::WORDS];
        self.write(&mut words);
        words
    }
}

fn command(code: u32, color: Rgb, semi_trans: bool) -> u32 {
    code << 24 | color.to_word() | if semi_trans { CMD_SEMI_TRANS } else { 0 }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolyF3 {
    pub color: Rgb,
    pub xy: [Point; 3],
    pub semi_trans: bool,
}

impl Primitive for PolyF3 {
    const WORDS: usize = 4;

    fn write(&self, out: &mut [u32]) {
        out[0] = command(0x20, self.color, self.semi_trans);
        for (i, p) in self.xy.iter().enumerate() {
            out[1 + i] = p.to_word();
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolyF4 {
    pub color: Rgb,
    pub xy: [Point; 4],
    pub semi_trans: bool,
}

impl Primitive for PolyF4 {
    const WORDS: usize = 5;

    fn write(&self, out: &mut [u32]) {
        out[0] = command(0x28, self.color, self.semi_trans);
        for (i, p) in self.xy.iter().enumerate() {
            out[1 + i] = p.to_word();
        }
    }
}

/// Flat textured triangle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolyFt3 {
    pub color: Rgb,
    pub xy: [Point; 3],
    pub uv: [Uv; 3],
    pub clut: u16,
    pub tpage: u16,
    pub semi_trans: bool,
}

impl Primitive for PolyFt3 {
    const WORDS: usize = 7;

    fn write(&self, out: &mut [u32]) {
        out[0] = command(0x24, self.color, self.semi_trans);
        let attrs = [self.clut, self.tpage, 0];
        for i in 0..3 {
            out[1 + i * 2] = self.xy[i].to_word();
            out[2 + i * 2] = self.uv[i].to_word(attrs[i]);
        }
    }
}

/// Flat textured quad; vertices in Z order (top-left, top-right, bottom-left, bottom-right)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolyFt4 {
    pub color: Rgb,
    pub xy: [Point; 4],
    pub uv: [Uv; 4],
    pub clut: u16,
    pub tpage: u16,
    pub semi_trans: bool,
}

impl Primitive for PolyFt4 {
    const WORDS: usize = 9;

    fn write(&self, out: &mut [u32]) {
        out[0] = command(0x2c, self.color, self.semi_trans);
        let attrs = [self.clut, self.tpage, 0, 0];
        for i in 0..4 {
            out[1 + i * 2] = self.xy[i].to_word();
            out[2 + i * 2] = self.uv[i].to_word(attrs[i]);
        }
    }
}

/// Open polyline through three points
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineF3 {
    pub color: Rgb,
    pub xy: [Point; 3],
}

impl Primitive for LineF3 {
    const WORDS: usize = 5;

    fn write(&self, out: &mut [u32]) {
        out[0] = command(0x48, self.color, false);
        for (i, p) in self.xy.iter().enumerate() {
            out[1 + i] = p.to_word();
        }
        out[4] = LINE_TERMINATOR;
    }
}

/// Open polyline through four points
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineF4 {
    pub color: Rgb,
    pub xy: [Point; 4],
}

impl Primitive for LineF4 {
    const WORDS: usize = 6;

    fn write(&self, out: &mut [u32]) {
        out[0] = command(0x48, self.color, false);
        for (i, p) in self.xy.iter().enumerate() {
            out[1 + i] = p.to_word();
        }
        out[5] = LINE_TERMINATOR;
    }
}

/// Variable-size textured rectangle; uses the current draw-mode tpage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sprt {
    pub color: Rgb,
    pub xy: Point,
    pub uv: Uv,
    pub clut: u16,
    pub w: u16,
    pub h: u16,
}

impl Primitive for Sprt {
    const WORDS: usize = 4;

    fn write(&self, out: &mut [u32]) {
        out[0] = command(0x64, self.color, false);
        out[1] = self.xy.to_word();
        out[2] = self.uv.to_word(self.clut);
        out[3] = (self.h as u32) << 16 | self.w as u32;
    }
}

/// 8×8 textured rectangle; uses the current draw-mode tpage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sprt8 {
    pub color: Rgb,
    pub xy: Point,
    pub uv: Uv,
    pub clut: u16,
}

impl Primitive for Sprt8 {
    const WORDS: usize = 3;

    fn write(&self, out: &mut [u32]) {
        out[0] = command(0x74, self.color, false);
        out[1] = self.xy.to_word();
        out[2] = self.uv.to_word(self.clut);
    }
}

/// Untextured rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tile {
    pub color: Rgb,
    pub xy: Point,
    pub w: u16,
    pub h: u16,
    pub semi_trans: bool,
}

impl Primitive for Tile {
    const WORDS: usize = 3;

    fn write(&self, out: &mut [u32]) {
        out[0] = command(0x60, self.color, self.semi_trans);
        out[1] = self.xy.to_word();
        out[2] = (self.h as u32) << 16 | self.w as u32;
    }
}

/// Draw-mode change (GP0 0xE1) linked in front of sprites
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DrTpage {
    pub tpage: u16,
    pub dither: bool,
    pub draw_on_display: bool,
}

impl Primitive for DrTpage {
    const WORDS: usize = 1;

    fn write(&self, out: &mut [u32]) {
        out[0] = 0xe100_0000
            | (self.tpage as u32 & 0x9ff)
            | (self.dither as u32) << 9
            | (self.draw_on_display as u32) << 10;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_word() {
        let p = Point::new(-3, 200);
        assert_eq!(p.to_word(), 200 << 16 | 0xfffd);
        assert_eq!(Point::from_word(p.to_word()), p);
    }

    #[test]
    fn test_poly_ft3_layout() {
        let poly = PolyFt3 {
            color: Rgb::NEUTRAL,
            xy: [Point::new(1, 2), Point::new(3, 4), Point::new(5, 6)],
            uv: [Uv::new(0, 0), Uv::new(63, 0), Uv::new(0, 63)],
            clut: 0x7800,
            tpage: 0x008a,
            semi_trans: false,
        };
        let words = poly.to_words();
        assert_eq!(words.len(), PolyFt3::WORDS);
        assert_eq!(words[0], 0x2480_8080);
        assert_eq!(words[2], 0x7800_0000);
        assert_eq!(words[4], 0x008a_003f);
        assert_eq!(words[6], 0x0000_3f00);
    }

    #[test]
    fn test_semi_trans_bit() {
        let tile = Tile { semi_trans: true, ..Default::default() };
        assert_eq!(tile.to_words()[0] >> 24, 0x62);
        let quad = PolyF4 { semi_trans: true, ..Default::default() };
        assert_eq!(quad.to_words()[0] >> 24, 0x2a);
    }

    #[test]
    fn test_line_terminated() {
        let line = LineF4::default();
        assert_eq!(*line.to_words().last().unwrap(), LINE_TERMINATOR);
        assert_eq!(LineF3::default().to_words()[4], LINE_TERMINATOR);
    }
}
