//! psxq viewer
//!
//! Runs the PS1 back-end against the software GPU and shows what it scans
//! out: a rotating subdivided cube, a text HUD and the console tail.
//!
//! Usage: `psxq-viewer [config.ron] [disc.iso] [+command args ...]`

mod demo;

use std::path::{Path, PathBuf};

use log::{error, info, warn};
use macroquad::prelude::*;
use psxq::cdrom::{CdDrive, IsoImage};
use psxq::config::load_config;
use psxq::geometry::Matrix;
use psxq::gpu::SoftGpu;
use psxq::host::HostError;
use psxq::vram::{Texture, TextureUpload};
use psxq::{EngineConfig, Host};

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

type ViewerHost = Host<Box<dyn CdDrive>, SoftGpu>;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("psxq viewer v{}", VERSION),
        window_width: 320 * 3,
        window_height: 240 * 3,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn open_drive(iso: Option<&Path>) -> Box<dyn CdDrive> {
    if let Some(path) = iso {
        match IsoImage::open_path(path) {
            Ok(image) => return Box::new(image),
            Err(e) => warn!("Failed to mount {}: {}, using the demo disc", path.display(), e),
        }
    }
    Box::new(demo::disc())
}

/// Build the host, boot the console and upload the demo textures.
fn start(
    config: &EngineConfig,
    drive: Box<dyn CdDrive>,
    launch_args: &[String],
) -> Result<(ViewerHost, Option<Texture>), HostError> {
    let mut host = Host::new(config.clone(), drive, SoftGpu::new())?;
    host.boot(&demo::palette(), launch_args.iter().cloned());

    let charset = demo::charset();
    host.draw2d.charset = host.load_texture(&TextureUpload::new("conchars", 128, 128, &charset).alpha(true));
    let checker = demo::checker(64);
    let wall = host
        .load_texture(&TextureUpload::new("demo/checker", 64, 64, &checker))
        .and_then(|id| host.texture(id).cloned());
    Ok((host, wall))
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config_path: Option<PathBuf> = None;
    let mut iso_path: Option<PathBuf> = None;
    let mut launch_args = vec!["psxq".to_string()];
    for arg in std::env::args().skip(1) {
        let lower = arg.to_ascii_lowercase();
        if lower.ends_with(".ron") {
            config_path = Some(PathBuf::from(arg));
        } else if lower.ends_with(".iso") {
            iso_path = Some(PathBuf::from(arg));
        } else {
            launch_args.push(arg);
        }
    }

    let config = match config_path {
        Some(path) => load_config(&path).unwrap_or_else(|e| {
            error!("Failed to load {}: {}, using defaults", path.display(), e);
            EngineConfig::default()
        }),
        None => EngineConfig::default(),
    };

    let (mut host, mut wall) = match start(&config, open_drive(iso_path.as_deref()), &launch_args) {
        Ok(started) => started,
        Err(e) => {
            error!("Failed to start: {}", e);
            return;
        }
    };

    let mut show_vram = false;
    let mut angle = 0i32;

    info!("=== psxq viewer ===");

    loop {
        if is_key_pressed(KeyCode::Tab) {
            show_vram = !show_vram;
        }
        if is_key_pressed(KeyCode::F12) {
            match host.gpu.save_vram_png("vram.png") {
                Ok(()) => host.console.print("wrote vram.png"),
                Err(e) => error!("Failed to save vram.png: {}", e),
            }
        }
        let level = host.subdivision_level();
        if is_key_pressed(KeyCode::Up) && level < 4 {
            let _ = host.console.add_text(&format!("r_subdivide {}\n", level + 1));
        }
        if is_key_pressed(KeyCode::Down) && level > 1 {
            let _ = host.console.add_text(&format!("r_subdivide {}\n", level - 1));
        }

        #[cfg(not(target_arch = "wasm32"))]
        if is_key_pressed(KeyCode::O) {
            let dialog = rfd::FileDialog::new().add_filter("CD image", &["iso"]);
            if let Some(path) = dialog.pick_file() {
                match start(&config, open_drive(Some(&path)), &launch_args) {
                    Ok((new_host, new_wall)) => {
                        host = new_host;
                        wall = new_wall;
                    }
                    Err(e) => error!("Failed to restart with {}: {}", path.display(), e),
                }
            }
        }

        host.run_console();

        angle = (angle + 8) % psxq::geometry::ONE;
        host.gte.transform = Matrix::rotation(angle, angle * 3 / 2, angle / 2).with_translation([0, 0, 600]);
        let level = host.subdivision_level();
        if let Some(texture) = &wall {
            let (mut ctx, scratch) = host.draw_context();
            demo::draw_cube(&mut ctx, scratch, texture, 100, level);
        }

        let stats = host.renderer.stats();
        host.draw_string(8, 8, &format!("PSXQ R_SUBDIVIDE {}", level));
        host.draw_string(8, 18, &format!("PRIMS {} ARENA {}", stats.primitives, stats.arena_bytes));
        let bottom = host.config.video.height as i32 - 8;
        host.draw_console_tail(8, bottom, 4);
        host.end_frame();

        clear_background(Color::from_rgba(20, 20, 24, 255));
        let (width, height, pixels) = if show_vram {
            (1024, 512, host.gpu.vram_rgba())
        } else {
            let (area, pixels) = host.gpu.display_rgba();
            (area.w, area.h, pixels)
        };
        let texture = Texture2D::from_rgba8(width, height, &pixels);
        texture.set_filter(FilterMode::Nearest);

        let scale = (screen_width() / width as f32).min(screen_height() / height as f32);
        let (draw_w, draw_h) = (width as f32 * scale, height as f32 * scale);
        draw_texture_ex(
            &texture,
            (screen_width() - draw_w) / 2.0,
            (screen_height() - draw_h) / 2.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(Vec2::new(draw_w, draw_h)),
                ..Default::default()
            },
        );

        next_frame().await;
    }
}
