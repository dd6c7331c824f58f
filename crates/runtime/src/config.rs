use std::path::Path;

use frameguard_collision::CollisionConfig;
use frameguard_gameloop::LoopConfig;
use frameguard_monitor::MonitorConfig;
use frameguard_quality::QualityConfig;
use frameguard_render::{LodError, LodTable, RenderConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported config format: {0:?}")]
    UnsupportedFormat(String),
    #[error("invalid LOD table: {0}")]
    Lod(#[from] LodError),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Every component's configuration in one document.
///
/// Missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub monitor: MonitorConfig,
    pub quality: QualityConfig,
    pub collision: CollisionConfig,
    pub render: RenderConfig,
    pub game_loop: LoopConfig,
}

impl RuntimeConfig {
    /// Load from a `.json`, `.yaml` or `.yml` file and validate.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let config = match ext.as_str() {
            "json" => Self::from_json_str(&text)?,
            "yaml" | "yml" => Self::from_yaml_str(&text)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };
        tracing::info!(path = %path.display(), "runtime config loaded");
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize, e.g. to print the defaults.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject values the components would otherwise clamp or misbehave on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cell = self.collision.cell_size;
        if !(cell.is_finite() && cell > 0.0) {
            return Err(invalid("collision.cell_size", format!("must be positive, got {cell}")));
        }
        if self.game_loop.batch_size == 0 {
            return Err(invalid("game_loop.batch_size", "must be at least 1".to_string()));
        }
        if self.render.text_cache.max_cache_size == 0 {
            return Err(invalid("render.text_cache.max_cache_size", "must be at least 1".to_string()));
        }
        let q = &self.quality;
        if q.recovery_threshold <= q.reduction_threshold {
            return Err(invalid(
                "quality.recovery_threshold",
                format!(
                    "{} must exceed reduction_threshold {}",
                    q.recovery_threshold, q.reduction_threshold
                ),
            ));
        }
        if q.min_level > q.max_level {
            return Err(invalid(
                "quality.min_level",
                format!("{} is above max_level {}", q.min_level, q.max_level),
            ));
        }
        let e = &self.render.emergency;
        if e.activation_delay_ms <= 0.0 || e.deactivation_delay_ms <= 0.0 || e.max_step_ms <= 0.0 {
            return Err(invalid("render.emergency", "delays must be positive".to_string()));
        }
        LodTable::new(self.render.lod_levels.clone())?;
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
