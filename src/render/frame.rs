//! One half of the double-buffered frame.

use crate::config::EngineConfig;
use crate::gpu::{DisplayEnv, DisplayEnvCache, DrawEnv, Rgb, ScreenArea};

use super::ordering::{OrderingTable, PrimitiveArena};

pub struct RenderBuffer {
    pub disp: DisplayEnv,
    /// GP1 values for `disp`, computed once
    pub disp_cache: DisplayEnvCache,
    pub draw: DrawEnv,
    pub ot: OrderingTable,
    pub ui_ot: OrderingTable,
    pub arena: PrimitiveArena,
}

impl RenderBuffer {
    /// Buffer 0 scans out the top half of the framebuffer and draws into the
    /// bottom half; buffer 1 is the mirror image.
    pub fn new(index: usize, config: &EngineConfig) -> Self {
        let video = &config.video;
        let (w, h) = (video.width, video.height);
        let (disp_y, draw_y) = if index == 0 { (0, h) } else { (h, 0) };

        let mut disp = DisplayEnv::new(0, disp_y, w, h);
        disp.pal = video.pal;
        disp.interlace = video.interlace;
        disp.rgb24 = video.rgb24;
        disp.screen = ScreenArea {
            x: video.screen_x,
            y: video.screen_y,
            w: 0,
            h: 0,
        };

        let mut draw = DrawEnv::new(0, draw_y, w, h);
        draw.clear = true;
        draw.color = Rgb::new(video.clear_color[0], video.clear_color[1], video.clear_color[2]);

        Self {
            disp,
            disp_cache: DisplayEnvCache::from_env(&disp),
            draw,
            ot: OrderingTable::new(config.render.ot_len),
            ui_ot: OrderingTable::new(config.render.ui_ot_len),
            arena: PrimitiveArena::with_capacity_bytes(config.render.primitive_arena_bytes),
        }
    }

    /// Empty both tables and rewind the arena
    pub fn reset(&mut self) {
        self.arena.reset();
        self.ot.clear();
        self.ui_ot.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.arena.used_bytes() == 0 && self.ot.is_empty() && self.ui_ot.is_empty()
    }
}
