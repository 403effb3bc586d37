//! Persisted user preferences.

use crate::cursor::ViewportSize;
use crate::layout::BUILTIN_LAYOUT;
use crate::motion::MouseMode;
use crate::orchestrator::SurfaceRole;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no home directory")]
    NoHome,
}

/// Where a surface sits and how big it is. Unset coordinates mean "use the
/// default placement".
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfacePlacement {
    pub left: Option<f32>,
    pub top: Option<f32>,
    pub scale: f32,
}

impl Default for SurfacePlacement {
    fn default() -> Self {
        Self {
            left: None,
            top: None,
            scale: 1.0,
        }
    }
}

/// One position/scale mutation, emitted by the orchestrator for persistence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceConfigUpdate {
    pub role: SurfaceRole,
    pub left: Option<f32>,
    pub top: Option<f32>,
    pub scale: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub last_used_layout: String,
    pub mouse_mode: MouseMode,
    pub left_keyboard: SurfacePlacement,
    pub right_keyboard: SurfacePlacement,
    pub pointer: SurfacePlacement,
    pub click_buttons: SurfacePlacement,
    pub edit_mode: bool,
    /// Set when the pointer drives a remote-session canvas rather than the
    /// local display.
    pub remote_viewport: Option<ViewportSize>,
    pub debug_logging: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            last_used_layout: BUILTIN_LAYOUT.to_string(),
            mouse_mode: MouseMode::Trackpoint,
            left_keyboard: SurfacePlacement::default(),
            right_keyboard: SurfacePlacement::default(),
            pointer: SurfacePlacement::default(),
            click_buttons: SurfacePlacement::default(),
            edit_mode: false,
            remote_viewport: None,
            debug_logging: false,
        }
    }
}

impl AppConfig {
    pub fn placement(&self, role: SurfaceRole) -> &SurfacePlacement {
        match role {
            SurfaceRole::LeftKeyboard => &self.left_keyboard,
            SurfaceRole::RightKeyboard => &self.right_keyboard,
            SurfaceRole::Pointer => &self.pointer,
            SurfaceRole::ClickButtons => &self.click_buttons,
        }
    }

    pub fn placement_mut(&mut self, role: SurfaceRole) -> &mut SurfacePlacement {
        match role {
            SurfaceRole::LeftKeyboard => &mut self.left_keyboard,
            SurfaceRole::RightKeyboard => &mut self.right_keyboard,
            SurfaceRole::Pointer => &mut self.pointer,
            SurfaceRole::ClickButtons => &mut self.click_buttons,
        }
    }

    pub fn apply_update(&mut self, update: &SurfaceConfigUpdate) {
        let placement = self.placement_mut(update.role);
        if let Some(left) = update.left {
            placement.left = Some(left);
        }
        if let Some(top) = update.top {
            placement.top = Some(top);
        }
        if let Some(scale) = update.scale {
            placement.scale = scale;
        }
    }
}

/// Loads and saves [`AppConfig`] as pretty JSON.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: AppConfig,
}

impl ConfigStore {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs_next::home_dir()
            .map(|home| home.join(".tapdeck").join("config.json"))
            .ok_or(ConfigError::NoHome)
    }

    /// Load from `path`. A missing or unreadable file yields defaults.
    pub fn open(path: PathBuf) -> Self {
        match Self::load(path.clone()) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                Self::with_defaults(path)
            }
        }
    }

    /// Load from `path`; a missing or empty file is not an error.
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        let config = Self::read(&path)?.unwrap_or_default();
        Ok(Self { path, config })
    }

    pub fn with_defaults(path: PathBuf) -> Self {
        Self {
            path,
            config: AppConfig::default(),
        }
    }

    fn read(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.config)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Save, logging instead of failing.
    pub fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to save config");
        }
    }

    pub fn apply_update(&mut self, update: &SurfaceConfigUpdate) {
        self.config.apply_update(update);
        self.persist();
    }

    pub fn reset(&mut self) {
        self.config = AppConfig::default();
        self.persist();
    }
}
