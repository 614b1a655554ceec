//! Display and drawing environments
//!
//! The display environment says which part of VRAM is scanned out and how;
//! its four GP1 register values are computed once and replayed every frame.
//! The drawing environment is a short run of GP0 state commands (clip area,
//! offset, draw mode) optionally followed by a background fill.

use bitfield::bitfield;

use super::{Gpu, Rect, Rgb};

bitfield! {
    /// GP1(0x08) display mode
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct DisplayMode(u32);
    impl Debug;
    pub hres, set_hres: 1, 0;
    pub vres, set_vres: 2;
    pub pal, set_pal: 3;
    pub rgb24, set_rgb24: 4;
    pub interlace, set_interlace: 5;
    pub hres368, set_hres368: 6;
    pub reverse, set_reverse: 7;
}

bitfield! {
    /// GP1(0x05) start of the displayed area in VRAM
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct DisplayStart(u32);
    impl Debug;
    pub x, set_x: 9, 0;
    pub y, set_y: 18, 10;
}

bitfield! {
    /// GP1(0x06) horizontal display range in GPU clock ticks
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct HorizontalRange(u32);
    impl Debug;
    pub start, set_start: 11, 0;
    pub end, set_end: 23, 12;
}

bitfield! {
    /// GP1(0x07) vertical display range in scanlines
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct VerticalRange(u32);
    impl Debug;
    pub start, set_start: 9, 0;
    pub end, set_end: 19, 10;
}

/// Centre of the visible area in GPU ticks/lines
const SCREEN_CENTER_X: i32 = 0x760;
const SCREEN_CENTER_Y_NTSC: i32 = 0x88;
const SCREEN_CENTER_Y_PAL: i32 = 0xa3;

/// Adjustment of the picture on the TV; zero sizes mean "standard"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenArea {
    pub x: i16,
    pub y: i16,
    pub w: u16,
    pub h: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayEnv {
    /// Framebuffer region scanned out
    pub disp: Rect,
    pub screen: ScreenArea,
    pub pal: bool,
    pub interlace: bool,
    pub rgb24: bool,
    pub reverse: bool,
}

impl DisplayEnv {
    pub fn new(x: u16, y: u16, w: u16, h: u16) -> Self {
        Self {
            disp: Rect::new(x, y, w, h),
            ..Default::default()
        }
    }
}

/// Precomputed GP1 register values for one display environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayEnvCache {
    pub start: DisplayStart,
    pub h_range: HorizontalRange,
    pub v_range: VerticalRange,
    pub mode: DisplayMode,
}

impl DisplayEnvCache {
    pub fn from_env(env: &DisplayEnv) -> Self {
        let mut mode = DisplayMode(0);
        mode.set_pal(env.pal);
        mode.set_rgb24(env.rgb24);
        mode.set_interlace(env.interlace);
        mode.set_reverse(env.reverse);

        let w = env.disp.w;
        if w > 560 {
            mode.set_hres(3);
        } else if w > 400 {
            mode.set_hres(2);
        } else if w > 352 {
            mode.set_hres368(true);
        } else if w > 280 {
            mode.set_hres(1);
        }
        if env.disp.h > 256 {
            mode.set_vres(true);
        }

        let h_span = if env.screen.w == 0 { 256 } else { env.screen.w as i32 } * 10 / 2;
        let v_span = if env.screen.h == 0 { 240 } else { env.screen.h as i32 } / 2;
        let center_y = if env.pal { SCREEN_CENTER_Y_PAL } else { SCREEN_CENTER_Y_NTSC };
        let x = env.screen.x as i32 + SCREEN_CENTER_X;
        let y = env.screen.y as i32 + center_y;

        let mut start = DisplayStart(0);
        start.set_x(env.disp.x as u32 & 0x3ff);
        start.set_y(env.disp.y as u32 & 0x1ff);

        let mut h_range = HorizontalRange(0);
        h_range.set_start((x - h_span) as u32 & 0xfff);
        h_range.set_end((x + h_span) as u32 & 0xfff);

        let mut v_range = VerticalRange(0);
        v_range.set_start((y - v_span) as u32 & 0x3ff);
        v_range.set_end((y + v_span) as u32 & 0x3ff);

        Self { start, h_range, v_range, mode }
    }

    /// GP1 0x05..0x08 command words in submission order
    pub fn gp1_words(&self) -> [u32; 4] {
        [
            0x0500_0000 | self.start.0,
            0x0600_0000 | self.h_range.0,
            0x0700_0000 | self.v_range.0,
            0x0800_0000 | self.mode.0,
        ]
    }

    pub fn submit(&self, gpu: &mut dyn Gpu) {
        for word in self.gp1_words() {
            gpu.write_gp1(word);
        }
    }
}

/// GP1(0x03) with bit 0 clear: display on
pub const GP1_DISPLAY_ENABLE: u32 = 0x0300_0000;
/// GP1(0x00): reset the GPU
pub const GP1_RESET: u32 = 0x0000_0000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawEnv {
    /// Drawing area; primitives are clipped to it
    pub clip: Rect,
    /// Added to every vertex, relative to the clip origin
    pub offset: (i16, i16),
    pub tpage: u16,
    pub dither: bool,
    /// Allow drawing into the displayed area
    pub draw_on_display: bool,
    /// Fill the clip area with `color` before drawing
    pub clear: bool,
    pub color: Rgb,
}

impl DrawEnv {
    pub fn new(x: u16, y: u16, w: u16, h: u16) -> Self {
        Self {
            clip: Rect::new(x, y, w, h),
            ..Default::default()
        }
    }

    /// GP0 commands that establish this environment, one packet each
    pub fn packets(&self) -> Vec<Vec<u32>> {
        let clip = self.clip;
        let x1 = clip.x.saturating_add(clip.w.saturating_sub(1));
        let y1 = clip.y.saturating_add(clip.h.saturating_sub(1));
        let ox = (clip.x as i32 + self.offset.0 as i32) as u32;
        let oy = (clip.y as i32 + self.offset.1 as i32) as u32;

        let mut packets = vec![
            vec![
                0xe100_0000
                    | (self.tpage as u32 & 0x9ff)
                    | (self.dither as u32) << 9
                    | (self.draw_on_display as u32) << 10,
            ],
            vec![0xe200_0000],
            vec![0xe300_0000 | (clip.x as u32 & 0x3ff) | (clip.y as u32 & 0x3ff) << 10],
            vec![0xe400_0000 | (x1 as u32 & 0x3ff) | (y1 as u32 & 0x3ff) << 10],
            vec![0xe500_0000 | (ox & 0x7ff) | (oy & 0x7ff) << 11],
        ];

        if self.clear {
            packets.push(vec![
                0x0200_0000 | self.color.to_word(),
                (clip.y as u32) << 16 | clip.x as u32,
                (clip.h as u32) << 16 | clip.w as u32,
            ]);
        }
        packets
    }

    pub fn submit(&self, gpu: &mut dyn Gpu) {
        for packet in self.packets() {
            gpu.draw_packet(&packet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ntsc_320x240() {
        let env = DisplayEnv::new(0, 240, 320, 240);
        let cache = DisplayEnvCache::from_env(&env);

        assert_eq!(cache.mode.0, 0x01);
        assert_eq!(cache.start.0, 240 << 10);
        // 256 * 10 / 2 ticks either side of 0x760
        assert_eq!(cache.h_range.start(), 0x760 - 1280);
        assert_eq!(cache.h_range.end(), 0x760 + 1280);
        assert_eq!(cache.v_range.start(), 0x88 - 120);
        assert_eq!(cache.v_range.end(), 0x88 + 120);
        assert_eq!(cache.gp1_words()[0], 0x0500_0000 | 240 << 10);
        assert_eq!(cache.gp1_words()[3], 0x0800_0001);
    }

    #[test]
    fn test_pal_interlaced_hires() {
        let mut env = DisplayEnv::new(0, 0, 640, 512);
        env.pal = true;
        env.interlace = true;
        let cache = DisplayEnvCache::from_env(&env);

        assert_eq!(cache.mode.hres(), 3);
        assert!(cache.mode.vres());
        assert!(cache.mode.pal());
        assert!(cache.mode.interlace());
        assert_eq!(cache.mode.0, 0x03 | 0x04 | 0x08 | 0x20);
        assert_eq!(cache.v_range.start(), 0xa3 - 120);
    }

    #[test]
    fn test_hres_thresholds() {
        let mode = |w| DisplayEnvCache::from_env(&DisplayEnv::new(0, 0, w, 240)).mode;
        assert_eq!(mode(256).0, 0);
        assert_eq!(mode(320).hres(), 1);
        assert!(mode(368).hres368());
        assert_eq!(mode(512).hres(), 2);
    }

    #[test]
    fn test_screen_adjustment() {
        let mut env = DisplayEnv::new(0, 0, 320, 240);
        env.screen = ScreenArea { x: 16, y: -8, w: 320, h: 224 };
        let cache = DisplayEnvCache::from_env(&env);
        assert_eq!(cache.h_range.start(), (0x760 + 16 - 1600) as u32);
        assert_eq!(cache.v_range.end(), (0x88 - 8 + 112) as u32);
    }

    #[test]
    fn test_draw_env_packets() {
        let mut env = DrawEnv::new(0, 240, 320, 240);
        env.clear = true;
        env.color = Rgb::new(0x10, 0x20, 0x30);
        let packets = env.packets();

        assert_eq!(packets.len(), 6);
        assert_eq!(packets[2][0], 0xe300_0000 | 240 << 10);
        assert_eq!(packets[3][0], 0xe400_0000 | 319 | 479 << 10);
        assert_eq!(packets[4][0], 0xe500_0000 | 240 << 11);
        assert_eq!(packets[5], vec![0x0230_2010, 240 << 16, 240 << 16 | 320]);
    }
}
