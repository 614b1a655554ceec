//! Leaf draws
//!
//! Transform a triangle or quad, reject it when it faces away or falls past
//! the ordering table, and record the primitive in the world table at
//! `otz >> 2`. Textured faces get the texture's tpage and the opaque CLUT;
//! untextured faces are drawn as wireframe.

use crate::fatal;
use crate::gpu::{LineF3, LineF4, PolyFt3, PolyFt4, Rgb, Uv};
use crate::render::{Renderer, Table};
use crate::vram::{Palette, Texture};

use super::gte::{normal_clip, GeometryUnit, SVector};

pub struct DrawContext<'a> {
    pub gte: &'a dyn GeometryUnit,
    pub renderer: &'a mut Renderer,
    pub clut: u16,
}

fn texel_uv(texture: &Texture, uv: Uv) -> Uv {
    Uv::new(
        (texture.rect.x as u8).saturating_add(uv.u),
        (texture.rect.y as u8).saturating_add(uv.v),
    )
}

impl<'a> DrawContext<'a> {
    pub fn new(gte: &'a dyn GeometryUnit, renderer: &'a mut Renderer, palette: &Palette) -> Self {
        Self {
            gte,
            renderer,
            clut: palette.clut,
        }
    }

    /// Ordering-table depth for an average Z, `None` past the end of the table
    fn depth(&self, otz: i32) -> Option<i32> {
        let depth = otz >> 2;
        (depth < self.renderer.ot_len() as i32).then_some(depth)
    }

    /// Wireframe triangle; back-facing (negative winding) faces are skipped
    pub fn draw_tri(&mut self, verts: &[SVector; 3], color: Rgb) -> Option<i32> {
        let p = self.gte.project3(verts);
        if normal_clip(p[0].xy, p[1].xy, p[2].xy) < 0 {
            return None;
        }
        let depth = self.depth(self.gte.average_z3([p[0].sz, p[1].sz, p[2].sz]))?;
        let line = LineF3 {
            color,
            xy: [p[0].xy, p[1].xy, p[2].xy],
        };
        self.renderer.insert(Table::World, &line, depth);
        Some(depth)
    }

    /// Wireframe quad, vertices in strip order (v3 opposite v0)
    pub fn draw_quad(&mut self, verts: &[SVector; 4], color: Rgb) -> Option<i32> {
        let p = self.gte.project3(&[verts[0], verts[1], verts[2]]);
        if normal_clip(p[0].xy, p[1].xy, p[2].xy) < 0 {
            return None;
        }
        let p3 = self.gte.project(&verts[3]);
        let depth = self.depth(self.gte.average_z4([p[0].sz, p[1].sz, p[2].sz, p3.sz]))?;
        let line = LineF4 {
            color,
            xy: [p[0].xy, p[1].xy, p[2].xy, p3.xy],
        };
        self.renderer.insert(Table::World, &line, depth);
        Some(depth)
    }

    /// Lit textured triangle. A missing texture here is a caller bug and fatal.
    pub fn draw_tri_tex(
        &mut self,
        verts: &[SVector; 3],
        normal: &SVector,
        uv: &[Uv; 3],
        texture: Option<&Texture>,
    ) -> Option<i32> {
        let Some(texture) = texture else {
            fatal!("draw_tri_tex: no texture");
        };
        let p = self.gte.project3(verts);
        if normal_clip(p[0].xy, p[1].xy, p[2].xy) < 0 {
            return None;
        }
        let depth = self.depth(self.gte.average_z3([p[0].sz, p[1].sz, p[2].sz]))?;
        let poly = PolyFt3 {
            color: self.gte.normal_color(normal),
            xy: [p[0].xy, p[1].xy, p[2].xy],
            uv: [texel_uv(texture, uv[0]), texel_uv(texture, uv[1]), texel_uv(texture, uv[2])],
            clut: self.clut,
            tpage: texture.tpage,
            semi_trans: false,
        };
        self.renderer.insert(Table::World, &poly, depth);
        Some(depth)
    }

    /// Lit textured quad, vertices in strip order. Quads are front-facing when
    /// their first three vertices wind negatively. A missing texture is
    /// logged and the quad skipped.
    pub fn draw_quad_tex(
        &mut self,
        verts: &[SVector; 4],
        normal: &SVector,
        uv: &[Uv; 4],
        texture: Option<&Texture>,
    ) -> Option<i32> {
        let Some(texture) = texture else {
            log::warn!("draw_quad_tex: no texture");
            return None;
        };
        let p = self.gte.project3(&[verts[0], verts[1], verts[2]]);
        if normal_clip(p[0].xy, p[1].xy, p[2].xy) > 0 {
            return None;
        }
        let p3 = self.gte.project(&verts[3]);
        let depth = self.depth(self.gte.average_z4([p[0].sz, p[1].sz, p[2].sz, p3.sz]))?;
        let poly = PolyFt4 {
            color: self.gte.normal_color(normal),
            xy: [p[0].xy, p[1].xy, p[2].xy, p3.xy],
            uv: [
                texel_uv(texture, uv[0]),
                texel_uv(texture, uv[1]),
                texel_uv(texture, uv[2]),
                texel_uv(texture, uv[3]),
            ],
            clut: self.clut,
            tpage: texture.tpage,
            semi_trans: false,
        };
        self.renderer.insert(Table::World, &poly, depth);
        Some(depth)
    }
}
