//! Double-buffered ordering-table renderer
//!
//! Primitives are always recorded into the back buffer. `present` waits for
//! the GPU, swaps the buffers, programs the environments of the buffer that
//! just became writable, and hands the previous buffer's chains to the GPU:
//! world table first, UI table on top.

use crate::config::EngineConfig;
use crate::fatal;
use crate::gpu::{Gpu, Primitive, GP1_DISPLAY_ENABLE, GP1_RESET};

use super::frame::RenderBuffer;

/// Which ordering table of the back buffer a primitive goes into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    World,
    Ui,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    /// Primitives submitted by the last present
    pub primitives: usize,
    /// Arena bytes used by the last presented frame
    pub arena_bytes: usize,
    pub bottlenecks: u64,
}

pub struct Renderer {
    buffers: [RenderBuffer; 2],
    back: usize,
    paranoid: bool,
    max_sync_ticks: u32,
    stats: FrameStats,
}

impl Renderer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            buffers: [RenderBuffer::new(0, config), RenderBuffer::new(1, config)],
            back: 0,
            paranoid: config.render.paranoid,
            max_sync_ticks: config.render.max_sync_ticks,
            stats: FrameStats::default(),
        }
    }

    /// Reset the GPU and program the first back buffer's environments.
    /// The display stays off until the first present.
    pub fn init(&mut self, gpu: &mut dyn Gpu) {
        gpu.write_gp1(GP1_RESET);
        let back = &self.buffers[self.back];
        back.draw.submit(gpu);
        back.disp_cache.submit(gpu);
        log::debug!(
            "renderer: {}x{} {}, ot {} + {}, arena {} bytes",
            back.disp.disp.w,
            back.disp.disp.h,
            if back.disp.pal { "PAL" } else { "NTSC" },
            back.ot.len(),
            back.ui_ot.len(),
            back.arena.capacity_bytes()
        );
    }

    pub fn back(&self) -> &RenderBuffer {
        &self.buffers[self.back]
    }

    pub fn front(&self) -> &RenderBuffer {
        &self.buffers[self.back ^ 1]
    }

    pub fn back_index(&self) -> usize {
        self.back
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn ot_len(&self) -> usize {
        self.buffers[self.back].ot.len()
    }

    pub fn ui_ot_len(&self) -> usize {
        self.buffers[self.back].ui_ot.len()
    }

    /// Record a primitive in the back buffer at `depth`, wrapped to the table.
    /// With paranoid checks on, a depth outside the table is fatal instead.
    /// Running out of arena space is always fatal.
    pub fn insert<P: Primitive>(&mut self, table: Table, prim: &P, depth: i32) {
        let back = &mut self.buffers[self.back];
        if self.paranoid {
            let len = match table {
                Table::World => back.ot.len(),
                Table::Ui => back.ui_ot.len(),
            };
            if depth < 0 || depth as usize >= len {
                fatal!("depth {} out of bounds for the {:?} table ({})", depth, table, len);
            }
        }
        let Some(offset) = back.arena.push(prim) else {
            fatal!(
                "primitive arena overflow ({} of {} bytes)",
                back.arena.used_bytes(),
                back.arena.capacity_bytes()
            );
        };
        match table {
            Table::World => back.ot.link(&mut back.arena, depth, offset),
            Table::Ui => back.ui_ot.link(&mut back.arena, depth, offset),
        }
    }

    /// Finish the frame: sync, swap, and submit what was recorded.
    pub fn present(&mut self, gpu: &mut dyn Gpu) {
        let ticks = gpu.draw_sync();
        if self.paranoid && ticks > self.max_sync_ticks {
            log::warn!("GPU bottlenecking ({} ticks)", ticks);
            self.stats.bottlenecks += 1;
        }
        gpu.vsync();

        let previous = self.back;
        self.back ^= 1;

        let back = &mut self.buffers[self.back];
        back.reset();
        back.draw.submit(gpu);
        back.disp_cache.submit(gpu);
        gpu.write_gp1(GP1_DISPLAY_ENABLE);

        let front = &self.buffers[previous];
        let mut count = 0;
        for packet in front.ot.chain(&front.arena).chain(front.ui_ot.chain(&front.arena)) {
            gpu.draw_packet(packet);
            count += 1;
        }

        self.stats.frames += 1;
        self.stats.primitives = count;
        self.stats.arena_bytes = front.arena.used_bytes();
        log::trace!("present: {} primitives, {} arena bytes", count, self.stats.arena_bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::{GpuEvent, RecordingGpu};
    use crate::gpu::{Point, Rgb, Tile, GP1_DISPLAY_ENABLE};

    fn tile(x: i16) -> Tile {
        Tile { color: Rgb::WHITE, xy: Point::new(x, 0), w: 1, h: 1, semi_trans: false }
    }

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.render.paranoid = true;
        config
    }

    #[test]
    fn test_present_resets_back_and_submits_previous() {
        let mut renderer = Renderer::new(&config());
        let mut gpu = RecordingGpu::new();
        renderer.init(&mut gpu);
        gpu.clear();

        renderer.insert(Table::World, &tile(1), 10);
        renderer.insert(Table::World, &tile(2), 20);
        renderer.insert(Table::Ui, &tile(3), 0);
        assert_eq!(renderer.back_index(), 0);

        renderer.present(&mut gpu);

        assert_eq!(renderer.back_index(), 1);
        assert!(renderer.back().is_empty());
        assert_eq!(renderer.stats().primitives, 3);

        // World chain back-to-front, then UI on top
        let drawn: Vec<i16> = gpu
            .packets()
            .iter()
            .filter(|p| p[0] >> 24 == 0x60)
            .map(|p| Point::from_word(p[1]).x)
            .collect();
        assert_eq!(drawn, vec![2, 1, 3]);

        // Sync points precede the swap; display is enabled before submission
        assert_eq!(gpu.events[0], GpuEvent::DrawSync);
        assert_eq!(gpu.events[1], GpuEvent::VSync);
        let enable = gpu.events.iter().position(|e| *e == GpuEvent::Gp1(GP1_DISPLAY_ENABLE));
        let first_tile = gpu
            .events
            .iter()
            .position(|e| matches!(e, GpuEvent::Packet(p) if p[0] >> 24 == 0x60));
        assert!(enable < first_tile);
    }

    #[test]
    fn test_new_back_programs_its_environments() {
        let config = config();
        let mut renderer = Renderer::new(&config);
        let mut gpu = RecordingGpu::new();
        renderer.present(&mut gpu);

        let back = renderer.back();
        assert_eq!(back.draw.clip.y, 0);
        assert_eq!(back.disp.disp.y, config.video.height);
        let start = back.disp_cache.gp1_words()[0];
        assert!(gpu.events.contains(&GpuEvent::Gp1(start)));
        assert!(gpu.packets().iter().any(|p| p[0] == 0xe300_0000));
    }

    #[test]
    fn test_front_is_untouched_by_inserts() {
        let mut renderer = Renderer::new(&config());
        let mut gpu = RecordingGpu::new();
        renderer.insert(Table::World, &tile(1), 0);
        renderer.present(&mut gpu);
        let front_used = renderer.front().arena.used_bytes();
        renderer.insert(Table::World, &tile(2), 0);
        assert_eq!(renderer.front().arena.used_bytes(), front_used);
        assert!(renderer.back().arena.used_bytes() > 0);
    }

    #[test]
    fn test_depth_beyond_table_wraps() {
        let mut config = config();
        config.render.paranoid = false;
        let mut renderer = Renderer::new(&config);
        let len = renderer.ot_len() as i32;
        renderer.insert(Table::World, &tile(1), 3);
        renderer.insert(Table::World, &tile(2), 3 + len);
        let back = renderer.back();
        assert_eq!(back.ot.bucket(&back.arena, 3).count(), 2);
    }

    #[test]
    fn test_bottleneck_logged_not_fatal() {
        let mut renderer = Renderer::new(&config());
        let mut gpu = RecordingGpu::new();
        gpu.sync_ticks = u32::MAX;
        renderer.present(&mut gpu);
        assert_eq!(renderer.stats().bottlenecks, 1);
    }

    #[test]
    #[should_panic(expected = "primitive arena overflow")]
    fn test_arena_overflow_is_fatal() {
        let mut config = config();
        config.render.primitive_arena_bytes = 64;
        let mut renderer = Renderer::new(&config);
        for x in 0..5 {
            renderer.insert(Table::World, &tile(x), 0);
        }
    }

    #[test]
    #[should_panic(expected = "depth -1 out of bounds for the World table")]
    fn test_negative_depth_fatal_when_paranoid() {
        let mut renderer = Renderer::new(&config());
        renderer.insert(Table::World, &tile(1), -1);
    }

    #[test]
    #[should_panic(expected = "out of bounds for the Ui table (4)")]
    fn test_ui_depth_past_table_fatal_when_paranoid() {
        let mut renderer = Renderer::new(&config());
        renderer.insert(Table::Ui, &tile(1), 4);
    }
}
