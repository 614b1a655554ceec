//! Engine host
//!
//! Owns every subsystem and the GPU/CD collaborators for one frame loop:
//! run queued console commands, record world and UI primitives, present.

use log::info;
use thiserror::Error;

use crate::cdrom::{CdDrive, CdFileSystem};
use crate::config::{ConfigError, EngineConfig};
use crate::console::{Console, RegistryError};
use crate::geometry::{DrawContext, Gte, ScratchArena};
use crate::gpu::Gpu;
use crate::render::{Draw2d, FrameStats, Renderer};
use crate::vram::{Palette, Texture, TextureId, TextureUpload, VramAllocator};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("console: {0}")]
    Registry(#[from] RegistryError),
}

pub struct Host<D, G> {
    pub config: EngineConfig,
    pub console: Console,
    pub vram: VramAllocator,
    pub renderer: Renderer,
    pub draw2d: Draw2d,
    pub gte: Gte,
    pub scratch: ScratchArena,
    pub files: CdFileSystem<D>,
    pub gpu: G,
}

impl<D: CdDrive, G: Gpu> Host<D, G> {
    pub fn new(config: EngineConfig, drive: D, mut gpu: G) -> Result<Self, HostError> {
        config.validate()?;
        let console = Console::new(&config.console)?;

        let mut renderer = Renderer::new(&config);
        renderer.init(&mut gpu);

        let (width, height, pal) = (config.video.width, config.video.height, config.video.pal);
        let host = Self {
            console,
            vram: VramAllocator::new(&config.vram),
            renderer,
            draw2d: Draw2d::new(Palette::new(&config.vram), width, height),
            gte: Gte::new(width, height),
            scratch: ScratchArena::new(config.render.scratch_bytes),
            files: CdFileSystem::new(drive, &config.cd),
            gpu,
            config,
        };
        info!(
            "host: {}x{} {}, {} texture pages",
            width,
            height,
            if pal { "PAL" } else { "NTSC" },
            host.vram.pages().len()
        );
        Ok(host)
    }

    /// Upload the game palette and queue the start-up scripts.
    pub fn boot<I, S>(&mut self, palette_rgb: &[u8], launch_args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.draw2d.palette.upload(&mut self.gpu, palette_rgb);
        self.console.set_launch_args(launch_args);
        // Overflow is reported by the buffer
        let _ = self.console.add_text("exec autoexec.cfg\nstuffcmds\n");
    }

    /// Execute queued console text; `exec` reads scripts off the disc.
    pub fn run_console(&mut self) {
        self.console.execute(&mut self.files);
    }

    pub fn load_texture(&mut self, upload: &TextureUpload<'_>) -> Option<TextureId> {
        self.vram.load_texture(&mut self.gpu, upload)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.vram.texture(id)
    }

    /// Leaf and subdivided draws into the current back buffer, with the
    /// scratch arena the subdivider works in.
    pub fn draw_context(&mut self) -> (DrawContext<'_>, &mut ScratchArena) {
        (
            DrawContext::new(&self.gte, &mut self.renderer, &self.draw2d.palette),
            &mut self.scratch,
        )
    }

    /// Subdivision level from `r_subdivide`, at least 1.
    pub fn subdivision_level(&self) -> i32 {
        (self.console.cvars().value("r_subdivide") as i32).max(1)
    }

    pub fn draw_string(&mut self, x: i32, y: i32, text: &str) {
        self.draw2d.draw_string(&mut self.renderer, &self.vram, x, y, text);
    }

    /// The last `lines` console lines, bottom-aligned above `y`.
    pub fn draw_console_tail(&mut self, x: i32, y: i32, lines: usize) {
        let transcript: Vec<&str> = self.console.transcript().collect();
        let tail = &transcript[transcript.len().saturating_sub(lines)..];
        for (i, line) in tail.iter().enumerate() {
            let row = (tail.len() - i) as i32;
            self.draw2d
                .draw_string(&mut self.renderer, &self.vram, x, y - row * crate::render::CHAR_SIZE, line);
        }
    }

    /// Present the recorded frame.
    pub fn end_frame(&mut self) -> FrameStats {
        self.renderer.present(&mut self.gpu);
        self.renderer.stats()
    }

    /// Archived cvars as console script text.
    pub fn archived_cvars(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.console.cvars().write_variables(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdrom::DiscImage;
    use crate::geometry::SVector;
    use crate::gpu::recording::{GpuEvent, RecordingGpu};
    use crate::gpu::{Rgb, Uv};

    fn host(autoexec: &str) -> Host<DiscImage, RecordingGpu> {
        let disc = DiscImage::new().with_file("AUTOEXEC.CFG", autoexec.as_bytes());
        Host::new(EngineConfig::default(), disc, RecordingGpu::default()).unwrap()
    }

    #[test]
    fn test_boot_runs_autoexec_and_launch_commands() {
        let mut host = host("r_subdivide 3\necho autoexec done\n");
        host.boot(&[0; 768], ["psxq", "+echo", "from", "args"]);
        host.run_console();

        let out: Vec<_> = host.console.transcript().collect();
        assert_eq!(out, ["execing autoexec.cfg", "autoexec done", "from args"]);
        assert_eq!(host.subdivision_level(), 3);
        assert_eq!(host.files.open_count(), 0);
        assert!(host.archived_cvars().contains("r_subdivide \"3\""));
    }

    #[test]
    fn test_boot_uploads_palette_rows() {
        let mut host = host("");
        host.gpu.clear();
        host.boot(&[255; 768], std::iter::empty::<String>());
        let images = host.gpu.images();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].0.y + 1, images[1].0.y);
    }

    #[test]
    fn test_frame_submits_recorded_primitives() {
        let mut host = host("");
        let pixels = vec![1u8; 64 * 64];
        let id = host
            .load_texture(&TextureUpload::new("wall", 64, 64, &pixels))
            .unwrap();
        let texture = host.texture(id).cloned().unwrap();

        let quad = [
            SVector::new(-100, -100, 600),
            SVector::new(100, -100, 600),
            SVector::new(-100, 100, 600),
            SVector::new(100, 100, 600),
        ];
        let uv = [Uv::new(0, 0), Uv::new(63, 0), Uv::new(0, 63), Uv::new(63, 63)];
        let normal = SVector::new(0, 0, -4096);
        let level = host.subdivision_level();
        let (mut ctx, scratch) = host.draw_context();
        ctx.subdivide_quad(scratch, &quad, &normal, &uv, &texture, level);
        ctx.draw_tri(&[quad[0], quad[1], quad[2]], Rgb::WHITE);

        host.gpu.clear();
        let first = host.end_frame();
        assert_eq!(first.frames, 1);
        // Triangles and quads cull opposite windings, so one of the two draws
        assert!(first.primitives > 0);
        assert_eq!(host.scratch.used_bytes(), 0);

        let second = host.end_frame();
        assert_eq!(second.frames, 2);
        assert_eq!(second.primitives, 0);
        assert!(host.gpu.events.iter().any(|e| matches!(e, GpuEvent::VSync)));
    }
}
