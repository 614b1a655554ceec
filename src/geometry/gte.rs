//! Geometry transformation unit
//!
//! Fixed-point model of the coprocessor the leaf draws rely on: rotate and
//! translate a vertex, project it, average depths and light a normal. Units
//! follow the hardware: 4096 is 1.0 for matrices, normals and light vectors.

use bytemuck::{Pod, Zeroable};

use crate::gpu::{Point, Rgb};

/// Fixed-point 1.0
pub const ONE: i32 = 4096;

/// Model-space vertex or normal
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SVector {
    pub vx: i16,
    pub vy: i16,
    pub vz: i16,
    pub pad: i16,
}

impl SVector {
    pub const fn new(vx: i16, vy: i16, vz: i16) -> Self {
        Self { vx, vy, vz, pad: 0 }
    }
}

pub fn midpoint(a: &SVector, b: &SVector) -> SVector {
    SVector::new(
        ((a.vx as i32 + b.vx as i32) / 2) as i16,
        ((a.vy as i32 + b.vy as i32) / 2) as i16,
        ((a.vz as i32 + b.vz as i32) / 2) as i16,
    )
}

/// Rotation (4.12 fixed point) plus translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matrix {
    pub m: [[i16; 3]; 3],
    pub t: [i32; 3],
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        m: [[ONE as i16, 0, 0], [0, ONE as i16, 0], [0, 0, ONE as i16]],
        t: [0, 0, 0],
    };

    /// Rotation from angles where 4096 is a full turn, applied X then Y then Z
    pub fn rotation(ax: i32, ay: i32, az: i32) -> Self {
        let angle = |a: i32| (a as f32) * std::f32::consts::TAU / ONE as f32;
        let (sx, cx) = angle(ax).sin_cos();
        let (sy, cy) = angle(ay).sin_cos();
        let (sz, cz) = angle(az).sin_cos();
        let rows = [
            [cy * cz, sx * sy * cz - cx * sz, cx * sy * cz + sx * sz],
            [cy * sz, sx * sy * sz + cx * cz, cx * sy * sz - sx * cz],
            [-sy, sx * cy, cx * cy],
        ];
        let fixed = |f: f32| (f * ONE as f32).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        let mut m = [[0i16; 3]; 3];
        for (r, row) in rows.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                m[r][c] = fixed(value);
            }
        }
        Self { m, t: [0, 0, 0] }
    }

    pub fn with_translation(mut self, t: [i32; 3]) -> Self {
        self.t = t;
        self
    }

    /// `M·v >> 12 + T`, saturated to `i32`
    pub fn apply(&self, v: &SVector) -> [i32; 3] {
        let v = [v.vx as i64, v.vy as i64, v.vz as i64];
        let mut out = [0i32; 3];
        for (r, row) in self.m.iter().enumerate() {
            let dot: i64 = row.iter().zip(v).map(|(&m, v)| m as i64 * v).sum();
            let value = (dot >> 12) + self.t[r] as i64;
            out[r] = value.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        }
        out
    }
}

/// Screen position and depth of a transformed vertex
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Projected {
    pub xy: Point,
    pub sz: u16,
}

/// Signed doubled area of a screen triangle; the sign gives its winding
pub fn normal_clip(a: Point, b: Point, c: Point) -> i32 {
    let (ax, ay) = (a.x as i32, a.y as i32);
    (b.x as i32 - ax) * (c.y as i32 - ay) - (c.x as i32 - ax) * (b.y as i32 - ay)
}

/// What the leaf draws need from the transform unit
pub trait GeometryUnit {
    /// Rotate, translate and perspective-project one vertex
    fn project(&self, v: &SVector) -> Projected;

    fn project3(&self, v: &[SVector; 3]) -> [Projected; 3] {
        [self.project(&v[0]), self.project(&v[1]), self.project(&v[2])]
    }

    /// Ordering-table Z from three screen depths
    fn average_z3(&self, sz: [u16; 3]) -> i32;

    /// Ordering-table Z from four screen depths
    fn average_z4(&self, sz: [u16; 4]) -> i32;

    /// Light color for a model-space normal
    fn normal_color(&self, normal: &SVector) -> Rgb;
}

/// Software transform unit with one directional light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gte {
    pub transform: Matrix,
    /// Projection plane distance
    pub h: i32,
    /// Screen offset added after projection
    pub offset: (i32, i32),
    pub zsf3: i32,
    pub zsf4: i32,
    /// Light direction, 4096 = unit length
    pub light: SVector,
    pub light_color: Rgb,
    pub back_color: Rgb,
}

impl Gte {
    pub fn new(screen_width: u16, screen_height: u16) -> Self {
        Self {
            transform: Matrix::IDENTITY,
            h: screen_width as i32 / 2,
            offset: (screen_width as i32 / 2, screen_height as i32 / 2),
            zsf3: ONE / 3,
            zsf4: ONE / 4,
            light: SVector::new(0, -(ONE as i16), 0),
            light_color: Rgb::new(96, 96, 96),
            back_color: Rgb::new(64, 64, 64),
        }
    }
}

impl GeometryUnit for Gte {
    fn project(&self, v: &SVector) -> Projected {
        let [x, y, z] = self.transform.apply(v);
        let sz = z.clamp(0, u16::MAX as i32);
        // Divide overflow saturates like the hardware divider
        let ratio: i64 = if sz * 2 <= self.h {
            0x1ffff
        } else {
            ((self.h as i64) << 16) / sz as i64
        };
        let sx = self.offset.0 as i64 + ((x as i64 * ratio) >> 16);
        let sy = self.offset.1 as i64 + ((y as i64 * ratio) >> 16);
        Projected {
            xy: Point::new(sx.clamp(-0x400, 0x3ff) as i16, sy.clamp(-0x400, 0x3ff) as i16),
            sz: sz as u16,
        }
    }

    fn average_z3(&self, sz: [u16; 3]) -> i32 {
        let sum: i32 = sz.iter().map(|&z| z as i32).sum();
        (self.zsf3 * sum) >> 12
    }

    fn average_z4(&self, sz: [u16; 4]) -> i32 {
        let sum: i32 = sz.iter().map(|&z| z as i32).sum();
        (self.zsf4 * sum) >> 12
    }

    fn normal_color(&self, normal: &SVector) -> Rgb {
        let dot = normal.vx as i64 * self.light.vx as i64
            + normal.vy as i64 * self.light.vy as i64
            + normal.vz as i64 * self.light.vz as i64;
        let intensity = (dot >> 12).clamp(0, ONE as i64) as i32;
        let channel = |back: u8, light: u8| (back as i32 + ((light as i32 * intensity) >> 12)).min(255) as u8;
        Rgb::new(
            channel(self.back_color.r, self.light_color.r),
            channel(self.back_color.g, self.light_color.g),
            channel(self.back_color.b, self.light_color.b),
        )
    }
}
