//! Recursive subdivision
//!
//! Large polygons are split through their edge midpoints into four children,
//! `level - 1` times, before reaching the leaf draws. Smaller pieces reduce
//! affine texture warping and let the ordering table sort them better. Each
//! level keeps its midpoints and child vertices in the scratch arena.

use crate::console::{CvarFlags, CvarRegistration};
use crate::fatal;
use crate::gpu::Uv;
use crate::vram::Texture;

use super::draw::DrawContext;
use super::gte::{midpoint, SVector};
use super::scratch::{ScratchArena, ScratchSlice};

inventory::submit! {
    CvarRegistration::new("r_subdivide", "2", CvarFlags::ARCHIVE)
}

/// Children of a triangle over `[v0, v1, v2, m01, m02, m12]`
const TRI_CHILDREN: [[usize; 3]; 4] = [[0, 3, 4], [5, 4, 3], [4, 5, 2], [3, 1, 5]];

/// Children of a strip-order quad over
/// `[v0, v1, v2, v3, m01, m02, m13, m23, m03]`; each keeps its parent's layout
const QUAD_CHILDREN: [[usize; 4]; 4] = [[0, 4, 5, 8], [4, 1, 8, 6], [5, 8, 2, 7], [8, 6, 7, 3]];

fn uv_midpoint(a: Uv, b: Uv) -> Uv {
    Uv::new(
        ((a.u as u16 + b.u as u16) / 2) as u8,
        ((a.v as u16 + b.v as u16) / 2) as u8,
    )
}

fn alloc<T: bytemuck::Pod>(scratch: &mut ScratchArena, len: usize) -> ScratchSlice<T> {
    match scratch.alloc(len) {
        Some(slice) => slice,
        None => fatal!(
            "scratch overflow ({} of {} bytes)",
            scratch.used_bytes(),
            scratch.capacity_bytes()
        ),
    }
}

fn check_level(level: i32) {
    if level <= 0 {
        fatal!("invalid subdivision level {}", level);
    }
}

impl DrawContext<'_> {
    pub fn subdivide_triangle(
        &mut self,
        scratch: &mut ScratchArena,
        verts: &[SVector; 3],
        normal: &SVector,
        uv: &[Uv; 3],
        texture: &Texture,
        level: i32,
    ) {
        check_level(level);
        let mark = scratch.watermark();
        let root = alloc::<SVector>(scratch, 3);
        let root_uv = alloc::<Uv>(scratch, 3);
        scratch.get_mut(root).copy_from_slice(verts);
        scratch.get_mut(root_uv).copy_from_slice(uv);
        self.triangle_level(scratch, root, root_uv, normal, texture, level);
        scratch.restore(mark);
    }

    fn triangle_level(
        &mut self,
        scratch: &mut ScratchArena,
        verts: ScratchSlice<SVector>,
        uvs: ScratchSlice<Uv>,
        normal: &SVector,
        texture: &Texture,
        level: i32,
    ) {
        if level <= 1 {
            let v = scratch.get(verts);
            let t = scratch.get(uvs);
            self.draw_tri_tex(&[v[0], v[1], v[2]], normal, &[t[0], t[1], t[2]], Some(texture));
            return;
        }

        let mark = scratch.watermark();
        let mids = alloc::<SVector>(scratch, 3);
        let mid_uvs = alloc::<Uv>(scratch, 3);
        let child = alloc::<SVector>(scratch, 3);
        let child_uvs = alloc::<Uv>(scratch, 3);

        let v: [SVector; 3] = [scratch.get(verts)[0], scratch.get(verts)[1], scratch.get(verts)[2]];
        let t: [Uv; 3] = [scratch.get(uvs)[0], scratch.get(uvs)[1], scratch.get(uvs)[2]];
        scratch
            .get_mut(mids)
            .copy_from_slice(&[midpoint(&v[0], &v[1]), midpoint(&v[0], &v[2]), midpoint(&v[1], &v[2])]);
        scratch
            .get_mut(mid_uvs)
            .copy_from_slice(&[uv_midpoint(t[0], t[1]), uv_midpoint(t[0], t[2]), uv_midpoint(t[1], t[2])]);

        for corners in TRI_CHILDREN {
            for (slot, &i) in corners.iter().enumerate() {
                let (point, coord) = if i < 3 {
                    (v[i], t[i])
                } else {
                    (scratch.get(mids)[i - 3], scratch.get(mid_uvs)[i - 3])
                };
                scratch.get_mut(child)[slot] = point;
                scratch.get_mut(child_uvs)[slot] = coord;
            }
            self.triangle_level(scratch, child, child_uvs, normal, texture, level - 1);
        }

        scratch.restore(mark);
    }

    pub fn subdivide_quad(
        &mut self,
        scratch: &mut ScratchArena,
        verts: &[SVector; 4],
        normal: &SVector,
        uv: &[Uv; 4],
        texture: &Texture,
        level: i32,
    ) {
        check_level(level);
        let mark = scratch.watermark();
        let root = alloc::<SVector>(scratch, 4);
        let root_uv = alloc::<Uv>(scratch, 4);
        scratch.get_mut(root).copy_from_slice(verts);
        scratch.get_mut(root_uv).copy_from_slice(uv);
        self.quad_level(scratch, root, root_uv, normal, texture, level);
        scratch.restore(mark);
    }

    fn quad_level(
        &mut self,
        scratch: &mut ScratchArena,
        verts: ScratchSlice<SVector>,
        uvs: ScratchSlice<Uv>,
        normal: &SVector,
        texture: &Texture,
        level: i32,
    ) {
        if level <= 1 {
            let v = scratch.get(verts);
            let t = scratch.get(uvs);
            self.draw_quad_tex(
                &[v[0], v[1], v[2], v[3]],
                normal,
                &[t[0], t[1], t[2], t[3]],
                Some(texture),
            );
            return;
        }

        let mark = scratch.watermark();
        let mids = alloc::<SVector>(scratch, 5);
        let mid_uvs = alloc::<Uv>(scratch, 5);
        let child = alloc::<SVector>(scratch, 4);
        let child_uvs = alloc::<Uv>(scratch, 4);

        let mut v = [SVector::default(); 4];
        v.copy_from_slice(scratch.get(verts));
        let mut t = [Uv::default(); 4];
        t.copy_from_slice(scratch.get(uvs));
        let edges = [(0, 1), (0, 2), (1, 3), (2, 3), (0, 3)];
        for (n, &(a, b)) in edges.iter().enumerate() {
            scratch.get_mut(mids)[n] = midpoint(&v[a], &v[b]);
            scratch.get_mut(mid_uvs)[n] = uv_midpoint(t[a], t[b]);
        }

        for corners in QUAD_CHILDREN {
            for (slot, &i) in corners.iter().enumerate() {
                let (point, coord) = if i < 4 {
                    (v[i], t[i])
                } else {
                    (scratch.get(mids)[i - 4], scratch.get(mid_uvs)[i - 4])
                };
                scratch.get_mut(child)[slot] = point;
                scratch.get_mut(child_uvs)[slot] = coord;
            }
            self.quad_level(scratch, child, child_uvs, normal, texture, level - 1);
        }

        scratch.restore(mark);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::geometry::{Gte, Matrix};
    use crate::gpu::Point;
    use crate::render::Renderer;
    use crate::vram::{Palette, VramAllocator};

    fn setup() -> (Gte, Renderer, Palette, Texture) {
        let config = EngineConfig::default();
        let mut gte = Gte::new(320, 240);
        gte.transform = Matrix::IDENTITY.with_translation([0, 0, 1000]);
        let mut vram = VramAllocator::new(&config.vram);
        let id = vram.pack("wall", 64, 64).unwrap();
        let texture = vram.texture(id).unwrap().clone();
        (gte, Renderer::new(&config), Palette::new(&config.vram), texture)
    }

    const TRI: [SVector; 3] = [
        SVector::new(-400, -400, 0),
        SVector::new(400, -400, 0),
        SVector::new(-400, 400, 0),
    ];

    const QUAD: [SVector; 4] = [
        SVector::new(-400, -400, 0),
        SVector::new(-400, 400, 0),
        SVector::new(400, -400, 0),
        SVector::new(400, 400, 0),
    ];

    fn packets(renderer: &Renderer) -> Vec<Vec<u32>> {
        let back = renderer.back();
        back.ot.chain(&back.arena).map(|p| p.to_vec()).collect()
    }

    #[test]
    fn test_triangle_leaf_count_per_level() {
        for (level, leaves) in [(1, 1), (2, 4), (3, 16)] {
            let (gte, mut renderer, palette, texture) = setup();
            let mut scratch = ScratchArena::new(1024);
            let mut ctx = DrawContext::new(&gte, &mut renderer, &palette);
            let uv = [Uv::new(0, 0), Uv::new(64, 0), Uv::new(0, 64)];
            ctx.subdivide_triangle(&mut scratch, &TRI, &SVector::default(), &uv, &texture, level);
            assert_eq!(packets(&renderer).len(), leaves);
            assert_eq!(scratch.used_bytes(), 0);
        }
    }

    #[test]
    fn test_quad_children_keep_winding() {
        let (gte, mut renderer, palette, texture) = setup();
        let mut scratch = ScratchArena::new(1024);
        let mut ctx = DrawContext::new(&gte, &mut renderer, &palette);
        let uv = [Uv::new(0, 0), Uv::new(0, 64), Uv::new(64, 0), Uv::new(64, 64)];
        ctx.subdivide_quad(&mut scratch, &QUAD, &SVector::default(), &uv, &texture, 3);
        // Every child survives the back-face test
        assert_eq!(packets(&renderer).len(), 16);
    }

    #[test]
    fn test_uvs_split_at_midpoints() {
        let (gte, mut renderer, palette, texture) = setup();
        let mut scratch = ScratchArena::new(1024);
        let mut ctx = DrawContext::new(&gte, &mut renderer, &palette);
        let uv = [Uv::new(0, 0), Uv::new(64, 0), Uv::new(0, 64)];
        ctx.subdivide_triangle(&mut scratch, &TRI, &SVector::default(), &uv, &texture, 2);

        // The corner child [v0, m01, m02] maps to the texture's top-left quarter
        let origin = (texture.rect.x as u32, texture.rect.y as u32);
        let corner = packets(&renderer)
            .into_iter()
            .find(|p| Point::from_word(p[1]) == gte_point(&gte, TRI[0]))
            .unwrap();
        assert_eq!(corner[2] & 0xffff, origin.1 << 8 | origin.0);
        assert_eq!(corner[4] & 0xffff, origin.1 << 8 | (origin.0 + 32));
        assert_eq!(corner[6] & 0xffff, (origin.1 + 32) << 8 | origin.0);
    }

    fn gte_point(gte: &Gte, v: SVector) -> Point {
        use crate::geometry::GeometryUnit;
        gte.project(&v).xy
    }

    #[test]
    fn test_scratch_grows_with_level() {
        let (gte, mut renderer, palette, texture) = setup();
        let uv = [Uv::default(); 4];
        let mut shallow = ScratchArena::new(1024);
        let mut deep = ScratchArena::new(1024);
        let mut ctx = DrawContext::new(&gte, &mut renderer, &palette);
        ctx.subdivide_quad(&mut shallow, &QUAD, &SVector::default(), &uv, &texture, 2);
        ctx.subdivide_quad(&mut deep, &QUAD, &SVector::default(), &uv, &texture, 4);
        assert!(deep.high_water_bytes() > shallow.high_water_bytes());
        assert_eq!(deep.used_bytes(), 0);
    }

    #[test]
    #[should_panic(expected = "scratch overflow")]
    fn test_scratch_overflow_fatal() {
        let (gte, mut renderer, palette, texture) = setup();
        let mut scratch = ScratchArena::new(128);
        let mut ctx = DrawContext::new(&gte, &mut renderer, &palette);
        ctx.subdivide_quad(&mut scratch, &QUAD, &SVector::default(), &[Uv::default(); 4], &texture, 6);
    }

    #[test]
    #[should_panic(expected = "invalid subdivision level")]
    fn test_level_zero_fatal() {
        let (gte, mut renderer, palette, texture) = setup();
        let mut scratch = ScratchArena::new(1024);
        let mut ctx = DrawContext::new(&gte, &mut renderer, &palette);
        ctx.subdivide_triangle(&mut scratch, &TRI, &SVector::default(), &[Uv::default(); 3], &texture, 0);
    }
}
