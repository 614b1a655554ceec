//! Built-in demo content for the viewer: palette, textures, a tiny font and
//! a cube, so the whole pipeline runs without any game data.

use psxq::cdrom::DiscImage;
use psxq::geometry::{DrawContext, ScratchArena, SVector, ONE};
use psxq::gpu::Uv;
use psxq::vram::Texture;

/// Palette index the font is drawn with (near white)
const FONT_INDEX: u8 = 127;

pub const AUTOEXEC: &str = "\
// demo disc start-up script
echo psxq viewer
echo up/down: subdivision  tab: vram  f12: png
alias fine \"r_subdivide 4\"
alias coarse \"r_subdivide 1\"
";

pub fn disc() -> DiscImage {
    DiscImage::new().with_file("AUTOEXEC.CFG", AUTOEXEC.as_bytes())
}

/// Grey ramp in the low half, a warm-to-cool ramp in the high half
pub fn palette() -> Vec<u8> {
    let mut rgb = Vec::with_capacity(768);
    for i in 0..256u32 {
        let color = if i < 128 {
            let v = (i * 2) as u8;
            [v, v, v]
        } else {
            let t = (i - 128) * 2;
            [t as u8, (t / 2) as u8, (255 - t) as u8]
        };
        rgb.extend_from_slice(&color);
    }
    rgb
}

pub fn checker(size: u16) -> Vec<u8> {
    let size = size as usize;
    (0..size * size)
        .map(|i| {
            let (x, y) = (i % size, i / size);
            if (x / 8 + y / 8) % 2 == 0 { 200 } else { 40 }
        })
        .collect()
}

/// 3×5 glyph rows, three bits each, most significant bit on the left
fn glyph_rows(c: u8) -> Option<[u8; 5]> {
    let rows = match c.to_ascii_uppercase() {
        b'0' => [7, 5, 5, 5, 7],
        b'1' => [2, 6, 2, 2, 7],
        b'2' => [7, 1, 7, 4, 7],
        b'3' => [7, 1, 7, 1, 7],
        b'4' => [5, 5, 7, 1, 1],
        b'5' => [7, 4, 7, 1, 7],
        b'6' => [7, 4, 7, 5, 7],
        b'7' => [7, 1, 1, 1, 1],
        b'8' => [7, 5, 7, 5, 7],
        b'9' => [7, 5, 7, 1, 7],
        b'A' => [2, 5, 7, 5, 5],
        b'B' => [6, 5, 6, 5, 6],
        b'C' => [7, 4, 4, 4, 7],
        b'D' => [6, 5, 5, 5, 6],
        b'E' => [7, 4, 6, 4, 7],
        b'F' => [7, 4, 6, 4, 4],
        b'G' => [7, 4, 5, 5, 7],
        b'H' => [5, 5, 7, 5, 5],
        b'I' => [7, 2, 2, 2, 7],
        b'J' => [1, 1, 1, 5, 7],
        b'K' => [5, 5, 6, 5, 5],
        b'L' => [4, 4, 4, 4, 7],
        b'M' => [5, 7, 7, 5, 5],
        b'N' => [6, 5, 5, 5, 5],
        b'O' => [7, 5, 5, 5, 7],
        b'P' => [7, 5, 7, 4, 4],
        b'Q' => [7, 5, 5, 7, 1],
        b'R' => [7, 5, 6, 5, 5],
        b'S' => [7, 4, 7, 1, 7],
        b'T' => [7, 2, 2, 2, 2],
        b'U' => [5, 5, 5, 5, 7],
        b'V' => [5, 5, 5, 5, 2],
        b'W' => [5, 5, 7, 7, 5],
        b'X' => [5, 5, 2, 5, 5],
        b'Y' => [5, 5, 2, 2, 2],
        b'Z' => [7, 1, 2, 4, 7],
        b'.' => [0, 0, 0, 0, 2],
        b',' => [0, 0, 0, 2, 4],
        b':' => [0, 2, 0, 2, 0],
        b';' => [0, 2, 0, 2, 4],
        b'-' => [0, 0, 7, 0, 0],
        b'+' => [0, 2, 7, 2, 0],
        b'=' => [0, 7, 0, 7, 0],
        b'_' => [0, 0, 0, 0, 7],
        b'/' => [1, 1, 2, 4, 4],
        b'"' => [5, 5, 0, 0, 0],
        b'\'' => [2, 2, 0, 0, 0],
        b'(' => [1, 2, 2, 2, 1],
        b')' => [4, 2, 2, 2, 4],
        b'<' => [1, 2, 4, 2, 1],
        b'>' => [4, 2, 1, 2, 4],
        b'!' => [2, 2, 2, 0, 2],
        b'?' => [7, 1, 3, 0, 2],
        b'*' => [5, 2, 7, 2, 5],
        b'%' => [5, 1, 2, 4, 5],
        _ => return None,
    };
    Some(rows)
}

/// 128×128 sheet of 8×8 cells, 16 per row, indexed by character code
pub fn charset() -> Vec<u8> {
    let mut pixels = vec![0u8; 128 * 128];
    for code in 0..=255u8 {
        let Some(rows) = glyph_rows(code) else {
            continue;
        };
        let cell_x = (code as usize & 15) * 8 + 2;
        let cell_y = (code as usize >> 4) * 8 + 1;
        for (y, bits) in rows.iter().enumerate() {
            for x in 0..3 {
                if bits & (4 >> x) != 0 {
                    pixels[(cell_y + y) * 128 + cell_x + x] = FONT_INDEX;
                }
            }
        }
    }
    pixels
}

/// Outward normal and the two edge directions of each face, `u × w = n`, so
/// every face winds the same way when seen from outside.
const FACES: [([i16; 3], [i16; 3], [i16; 3]); 6] = [
    ([0, 0, -1], [0, 1, 0], [1, 0, 0]),
    ([0, 0, 1], [1, 0, 0], [0, 1, 0]),
    ([1, 0, 0], [0, 1, 0], [0, 0, 1]),
    ([-1, 0, 0], [0, 0, 1], [0, 1, 0]),
    ([0, 1, 0], [0, 0, 1], [1, 0, 0]),
    ([0, -1, 0], [1, 0, 0], [0, 0, 1]),
];

pub fn draw_cube(
    ctx: &mut DrawContext<'_>,
    scratch: &mut ScratchArena,
    texture: &Texture,
    half: i16,
    level: i32,
) {
    let max = (texture.rect.w.min(texture.rect.h) - 1) as u8;
    let uv = [Uv::new(0, 0), Uv::new(0, max), Uv::new(max, 0), Uv::new(max, max)];
    for (n, u, w) in FACES {
        let corner = |su: i16, sw: i16| {
            let axis = |i: usize| (n[i] + u[i] * su + w[i] * sw) * half;
            SVector::new(axis(0), axis(1), axis(2))
        };
        let verts = [corner(-1, -1), corner(1, -1), corner(-1, 1), corner(1, 1)];
        let one = ONE as i16;
        let normal = SVector::new(n[0] * one, n[1] * one, n[2] * one);
        ctx.subdivide_quad(scratch, &verts, &normal, &uv, texture, level);
    }
}
