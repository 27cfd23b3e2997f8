use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

use crate::pdf::fit::{FALLBACK_FRACTION, FIT_MAX_SCALE, FIT_MIN_SCALE, FIT_PADDING};
use crate::pdf::{
    DEFAULT_BOX_CACHE_SIZE, DEFAULT_LOADER_WORKERS, PagingMode, SCALE_EPSILON, ViewerConfig, Zoom,
    ZoomLimits,
};

pub const CURRENT_VERSION: u32 = 2;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pdfpane";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_scale")]
    pub default_scale: f32,

    #[serde(default = "default_min_scale")]
    pub min_scale: f32,

    #[serde(default = "default_max_scale")]
    pub max_scale: f32,

    #[serde(default = "default_scale_step")]
    pub scale_step: f32,

    #[serde(default = "default_scale_epsilon")]
    pub scale_epsilon: f32,

    #[serde(default = "default_fit_padding")]
    pub fit_padding: f32,

    #[serde(default = "default_fit_min_scale")]
    pub fit_min_scale: f32,

    #[serde(default = "default_fit_max_scale")]
    pub fit_max_scale: f32,

    /// Share of the window used when the viewer container has no size yet
    #[serde(default = "default_fallback_fraction")]
    pub fallback_fraction: f32,

    #[serde(default)]
    pub paging_mode: PagingMode,

    #[serde(default = "default_loader_workers")]
    pub loader_workers: usize,

    #[serde(default = "default_page_box_cache_size")]
    pub page_box_cache_size: usize,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_scale() -> f32 {
    Zoom::DEFAULT_SCALE
}

fn default_min_scale() -> f32 {
    Zoom::MIN_SCALE
}

fn default_max_scale() -> f32 {
    Zoom::MAX_SCALE
}

fn default_scale_step() -> f32 {
    Zoom::SCALE_STEP
}

fn default_scale_epsilon() -> f32 {
    SCALE_EPSILON
}

fn default_fit_padding() -> f32 {
    FIT_PADDING
}

fn default_fit_min_scale() -> f32 {
    FIT_MIN_SCALE
}

fn default_fit_max_scale() -> f32 {
    FIT_MAX_SCALE
}

fn default_fallback_fraction() -> f32 {
    FALLBACK_FRACTION
}

fn default_loader_workers() -> usize {
    DEFAULT_LOADER_WORKERS
}

fn default_page_box_cache_size() -> usize {
    DEFAULT_BOX_CACHE_SIZE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            default_scale: default_scale(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            scale_step: default_scale_step(),
            scale_epsilon: default_scale_epsilon(),
            fit_padding: default_fit_padding(),
            fit_min_scale: default_fit_min_scale(),
            fit_max_scale: default_fit_max_scale(),
            fallback_fraction: default_fallback_fraction(),
            paging_mode: PagingMode::default(),
            loader_workers: default_loader_workers(),
            page_box_cache_size: default_page_box_cache_size(),
        }
    }
}

impl Settings {
    /// Library configuration derived from these settings. Values that make
    /// no sense (non-positive, inverted ranges) fall back to defaults.
    #[must_use]
    pub fn viewer_config(&self) -> ViewerConfig {
        ViewerConfig {
            paging_mode: self.paging_mode,
            zoom: ZoomLimits {
                min: self.min_scale,
                max: self.max_scale,
                step: self.scale_step,
                default: self.default_scale,
            },
            scale_epsilon: self.scale_epsilon,
            fit_padding: self.fit_padding,
            fit_min_scale: self.fit_min_scale,
            fit_max_scale: self.fit_max_scale,
            fallback_fraction: self.fallback_fraction,
            loader_workers: self.loader_workers,
            page_box_cache_size: self.page_box_cache_size,
        }
        .sanitized()
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

pub fn load_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };

    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, &path);
        }
    }
}

/// Replace the global settings with the file at `path`.
///
/// Returns false when the file could not be read or parsed; the current
/// settings are kept in that case.
pub fn load_settings_from_path(path: &Path) -> bool {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            return false;
        }
    };

    match serde_yaml::from_str::<Settings>(&content) {
        Ok(mut settings) => {
            debug!("Loaded settings from {path:?}");

            if settings.version < CURRENT_VERSION {
                migrate_settings(&mut settings);
                save_settings_to_file(&settings, path);
            }

            if let Ok(mut global) = SETTINGS.write() {
                *global = settings;
            }
            true
        }
        Err(e) => {
            error!("Failed to parse settings file {path:?}: {e}");
            false
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    if settings.version < 2 {
        migrate_v1_to_v2(settings);
    }

    settings.version = CURRENT_VERSION;
}

// v1 stored zoom values as percentages (125 for 1.25)
fn migrate_v1_to_v2(settings: &mut Settings) {
    for value in [
        &mut settings.default_scale,
        &mut settings.min_scale,
        &mut settings.max_scale,
        &mut settings.scale_step,
    ] {
        if *value >= Zoom::MIN_PERCENT {
            *value /= 100.0;
        }
    }
}

pub fn save_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, cannot save settings");
        return;
    };

    if let Ok(settings) = SETTINGS.read() {
        save_settings_to_file(&settings, &path);
    }
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = generate_settings_yaml(settings);

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str("\n# Zoom (1.0 = 100%)\n");
    content.push_str(&format!("default_scale: {}\n", settings.default_scale));
    content.push_str(&format!("min_scale: {}\n", settings.min_scale));
    content.push_str(&format!("max_scale: {}\n", settings.max_scale));
    content.push_str(&format!("scale_step: {}\n", settings.scale_step));
    content.push_str(&format!("scale_epsilon: {}\n", settings.scale_epsilon));
    content.push_str("\n# Fit to width / height\n");
    content.push_str(&format!("fit_padding: {}\n", settings.fit_padding));
    content.push_str(&format!("fit_min_scale: {}\n", settings.fit_min_scale));
    content.push_str(&format!("fit_max_scale: {}\n", settings.fit_max_scale));
    content.push_str(&format!(
        "fallback_fraction: {}\n",
        settings.fallback_fraction
    ));
    content.push_str("\n# Viewer\n");
    content.push_str(&format!(
        "paging_mode: {}\n",
        match settings.paging_mode {
            PagingMode::SinglePage => "single_page",
            PagingMode::Continuous => "continuous",
        }
    ));
    content.push_str(&format!("loader_workers: {}\n", settings.loader_workers));
    content.push_str(&format!(
        "page_box_cache_size: {}\n",
        settings.page_box_cache_size
    ));

    content
}

// Public API for accessing/modifying settings

#[must_use]
pub fn current() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}

#[must_use]
pub fn viewer_config() -> ViewerConfig {
    SETTINGS
        .read()
        .map(|s| s.viewer_config())
        .unwrap_or_default()
}

#[must_use]
pub fn get_default_scale() -> f32 {
    SETTINGS
        .read()
        .map(|s| s.default_scale)
        .unwrap_or_else(|_| default_scale())
}

#[must_use]
pub fn get_paging_mode() -> PagingMode {
    SETTINGS.read().map(|s| s.paging_mode).unwrap_or_default()
}
