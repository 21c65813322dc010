use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::library::{LibraryView, SortField, SortOrder};
use crate::zoom::{DisplayMode, FitOptions, ZoomMode};

/// Library listing preferences remembered between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryPrefs {
    pub view: LibraryView,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
}

/// Viewer tunables and persisted preferences.
/// Stored in the platform config directory (`$XDG_CONFIG_HOME/leafview/` or `%APPDATA%\leafview\`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Breathing room subtracted from each container axis before fitting.
    pub fit_padding: f64,
    /// Gap between the two pages of a spread.
    pub spread_gap: f64,
    /// Gap between placeholders in scroll mode.
    pub scroll_page_gap: f64,
    /// How far outside the viewport a placeholder starts rendering.
    pub lazy_render_margin: f64,
    pub wheel_throttle_ms: u64,
    pub resize_debounce_ms: u64,
    /// Visibility updates are ignored this long after a jump in scroll mode.
    pub jump_settle_ms: u64,
    /// Same, after opening straight into scroll mode.
    pub open_settle_ms: u64,
    pub zoom_step: f64,
    pub min_manual_scale: f64,
    pub max_manual_scale: f64,
    pub render_cache_entries: usize,
    pub render_cache_bytes: usize,
    pub default_display_mode: DisplayMode,
    pub default_zoom_mode: ZoomMode,
    pub library: LibraryPrefs,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fit_padding: 64.0,
            spread_gap: 16.0,
            scroll_page_gap: 16.0,
            lazy_render_margin: 600.0,
            wheel_throttle_ms: 400,
            resize_debounce_ms: 200,
            jump_settle_ms: 800,
            open_settle_ms: 150,
            zoom_step: 0.25,
            min_manual_scale: 0.25,
            max_manual_scale: 3.0,
            render_cache_entries: 256,
            render_cache_bytes: 256 * 1024 * 1024,
            default_display_mode: DisplayMode::Single,
            default_zoom_mode: ZoomMode::FitPage,
            library: LibraryPrefs::default(),
        }
    }
}

impl Config {
    /// Load config from the platform config directory, or return defaults.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!(
                    "No config file at {}, using defaults. Creating default config.",
                    path.display()
                );
                let config = Self::default();
                config.save_to(path);
                config
            }
        }
    }

    pub fn save(&self) {
        self.save_to(&config_path());
    }

    pub fn save_to(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    log::warn!("Failed to write config to {}: {}", path.display(), e);
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize config: {}", e);
            }
        }
    }

    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            padding: self.fit_padding,
            spread_gap: self.spread_gap,
        }
    }

    pub fn wheel_throttle(&self) -> Duration {
        Duration::from_millis(self.wheel_throttle_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn jump_settle(&self) -> Duration {
        Duration::from_millis(self.jump_settle_ms)
    }

    pub fn open_settle(&self) -> Duration {
        Duration::from_millis(self.open_settle_ms)
    }
}

fn config_path() -> PathBuf {
    let dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("leafview");
    if !dir.exists() {
        std::fs::create_dir_all(&dir).ok();
    }
    dir.join("config.json")
}
