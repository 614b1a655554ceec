//! Engine configuration
//!
//! Every fixed-size table in the back-end (ordering tables, primitive arena,
//! scratch, VRAM pages, CD handles, command buffer) is sized from here. The
//! defaults are the console's own constants; a RON file can override them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gpu::Rect;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u16,
    pub height: u16,
    pub pal: bool,
    pub interlace: bool,
    pub rgb24: bool,
    /// Horizontal/vertical nudge of the visible area on the TV
    pub screen_x: i16,
    pub screen_y: i16,
    pub clear_color: [u8; 3],
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            pal: false,
            interlace: false,
            rgb24: false,
            screen_x: 0,
            screen_y: 0,
            clear_color: [0, 0, 0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub ot_len: usize,
    pub ui_ot_len: usize,
    pub primitive_arena_bytes: usize,
    pub scratch_bytes: usize,
    /// Enables depth-counter bounds and GPU latency checks
    pub paranoid: bool,
    /// Draw-sync ticks above which a frame is reported as GPU-bound
    pub max_sync_ticks: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ot_len: 5 * 1024,
            ui_ot_len: 4,
            primitive_arena_bytes: 10 * 1024,
            scratch_bytes: 1024,
            paranoid: cfg!(debug_assertions),
            max_sync_ticks: 0x400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VramConfig {
    /// Page size in VRAM units (16-bit words)
    pub page_width: u16,
    pub page_height: u16,
    /// Bookkeeping budget shared by all pages
    pub max_rects: usize,
    /// Regions no texture page may overlap (framebuffers, CLUT rows)
    pub reserved: Vec<Rect>,
    pub clut_x: u16,
    pub clut_y: u16,
}

impl Default for VramConfig {
    fn default() -> Self {
        Self {
            page_width: 128,
            page_height: 256,
            max_rects: 2048,
            reserved: vec![
                Rect::new(0, 0, 320, 480),
                Rect::new(0, 480, 256, 2),
            ],
            clut_x: 0,
            clut_y: 480,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdConfig {
    pub max_files: usize,
}

impl Default for CdConfig {
    fn default() -> Self {
        Self { max_files: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub buffer_size: usize,
    pub max_args: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            buffer_size: 8192,
            max_args: 80,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub video: VideoConfig,
    pub render: RenderConfig,
    pub vram: VramConfig,
    pub cd: CdConfig,
    pub console: ConsoleConfig,
}

impl EngineConfig {
    /// Reject sizes the fixed tables cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render.ot_len == 0 || self.render.ui_ot_len == 0 {
            return Err(ConfigError::Invalid("ordering tables must not be empty".into()));
        }
        // One slot per 2D layer
        if self.render.ui_ot_len < 4 {
            return Err(ConfigError::Invalid("UI table needs at least 4 slots".into()));
        }
        if self.render.primitive_arena_bytes < 64 {
            return Err(ConfigError::Invalid("primitive arena too small".into()));
        }
        if self.vram.page_width == 0 || self.vram.page_height == 0 {
            return Err(ConfigError::Invalid("texture page has no area".into()));
        }
        if self.video.width == 0 || self.video.height == 0 {
            return Err(ConfigError::Invalid("video mode has no area".into()));
        }
        if self.cd.max_files == 0 {
            return Err(ConfigError::Invalid("need at least one CD file handle".into()));
        }
        Ok(())
    }
}

/// Load a config from a RON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config = load_config_from_str(&contents)?;
    Ok(config)
}

/// Parse a config from a RON string; missing fields take their defaults
pub fn load_config_from_str(s: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = ron::from_str(s)?;
    config.validate()?;
    Ok(config)
}

/// Save a config to a RON file
pub fn save_config<P: AsRef<Path>>(config: &EngineConfig, path: P) -> Result<(), ConfigError> {
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(3)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(config, pretty)?;
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_console_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.render.ot_len, 5120);
        assert_eq!(config.render.ui_ot_len, 4);
        assert_eq!(config.render.primitive_arena_bytes, 10240);
        assert_eq!(config.cd.max_files, 4);
        assert_eq!(config.console.buffer_size, 8192);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = load_config_from_str("(video: (pal: true, height: 256))").unwrap();
        assert!(config.video.pal);
        assert_eq!(config.video.height, 256);
        assert_eq!(config.video.width, 320);
        assert_eq!(config.render.ot_len, 5120);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = load_config_from_str("(render: (ot_len: 0))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = load_config_from_str("(render: (ui_ot_len: 2))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_save_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("psxq.ron");

        let mut config = EngineConfig::default();
        config.video.interlace = true;
        config.vram.reserved.push(Rect::new(512, 0, 64, 64));
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
