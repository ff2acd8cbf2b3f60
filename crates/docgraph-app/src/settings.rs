use docgraph_graph::{LabelStyle, LayoutConfig, ScaleExtent, ViewTransform};
use docgraph_search::LevelThreshold;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read or write settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    pub layout: LayoutConfig,
    pub view: ViewSettings,
    pub filter: FilterSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Zoom applied when a new graph is shown, centred on the container.
    pub initial_scale: f32,
    pub scale_extent: ScaleExtent,
    pub labels: LabelStyle,
    /// Screen pixels kept free around the graph by zoom-to-fit.
    pub fit_padding: f32,
    /// Pointer travel before a press becomes a drag.
    pub drag_threshold: f32,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            initial_scale: 1.0,
            scale_extent: ScaleExtent::default(),
            labels: LabelStyle::default(),
            fit_padding: 24.0,
            drag_threshold: 0.0,
        }
    }
}

impl ViewSettings {
    /// Initial transform: `initial_scale` about the container centre.
    pub fn initial_transform(&self, layout: &LayoutConfig) -> ViewTransform {
        let scale = self.scale_extent.clamp(self.initial_scale);
        let (cx, cy) = layout.container.center();
        ViewTransform::new(cx - cx * scale, cy - cy * scale, scale)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub level_threshold: LevelThreshold,
    pub bookmarked_only: bool,
    /// Hide non-matching chapters while a search is active.
    pub narrow_to_matches: bool,
}

impl WorkspaceSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docgraph").join("settings.json"))
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load from `path` (or the default location), falling back to defaults
    /// on any error.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Self::default();
        };
        if !path.exists() {
            tracing::info!("Settings file {:?} not found, using defaults", path);
            return Self::default();
        }
        match Self::load(&path) {
            Ok(settings) => {
                tracing::info!("Settings loaded from {:?}", path);
                settings
            }
            Err(e) => {
                tracing::error!("Failed to load settings from {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}
