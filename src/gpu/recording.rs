//! Test double that records every GPU call in order.

use super::{Gpu, Rect};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuEvent {
    Gp1(u32),
    Packet(Vec<u32>),
    Image(Rect, Vec<u16>),
    DrawSync,
    VSync,
}

#[derive(Debug, Default)]
pub struct RecordingGpu {
    pub events: Vec<GpuEvent>,
    /// Value returned from every draw-sync
    pub sync_ticks: u32,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packets(&self) -> Vec<&[u32]> {
        self.events
            .iter()
            .filter_map(|event| match event {
                GpuEvent::Packet(words) => Some(words.as_slice()),
                _ => None,
            })
            .collect()
    }

    pub fn images(&self) -> Vec<(Rect, &[u16])> {
        self.events
            .iter()
            .filter_map(|event| match event {
                GpuEvent::Image(rect, pixels) => Some((*rect, pixels.as_slice())),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Gpu for RecordingGpu {
    fn write_gp1(&mut self, word: u32) {
        self.events.push(GpuEvent::Gp1(word));
    }

    fn draw_packet(&mut self, words: &[u32]) {
        self.events.push(GpuEvent::Packet(words.to_vec()));
    }

    fn load_image(&mut self, rect: Rect, pixels: &[u16]) {
        self.events.push(GpuEvent::Image(rect, pixels.to_vec()));
    }

    fn draw_sync(&mut self) -> u32 {
        self.events.push(GpuEvent::DrawSync);
        self.sync_ticks
    }

    fn vsync(&mut self) {
        self.events.push(GpuEvent::VSync);
    }
}
