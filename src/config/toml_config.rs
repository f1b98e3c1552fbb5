use crate::core::composer::{ComposeSettings, Stacking};
use crate::core::fragment::FallbackPresets;
use crate::core::layout::LayoutSettings;
use crate::domain::ports::{LayoutSettingsProvider, ObjectPattern};
use crate::utils::error::{CutsheetError, Result};
use crate::utils::validation::{
    validate_dimension, validate_distance, validate_extension, validate_non_empty_string,
    validate_path, validate_positive_number, validate_range, validate_required_field,
    validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub layout: LayoutSettings,
    pub fallback: FallbackPresets,
    pub compose: ComposeConfig,
    pub assets: AssetsConfig,
    pub storage: StorageConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    pub stacking: Stacking,
    pub spacing: f64,
    pub output_prefix: String,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        let settings = ComposeSettings::default();
        Self {
            stacking: settings.stacking,
            spacing: settings.spacing,
            output_prefix: "cutting-plan".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub dir: String,
    pub separator_file: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: "plan_info".to_string(),
            separator_file: "separator.dxf".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Http,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory of the local backend.
    pub root: String,
    pub base_url: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    /// Substring every item drawing name carries after its identifier.
    pub marker: String,
    pub extension: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let pattern = ObjectPattern::default();
        Self {
            backend: StorageBackend::Local,
            root: "./drawings".to_string(),
            base_url: None,
            bucket: None,
            region: None,
            marker: pattern.marker,
            extension: pattern.extension,
        }
    }
}

impl StorageConfig {
    pub fn pattern(&self) -> ObjectPattern {
        ObjectPattern::new(self.marker.clone(), self.extension.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_seconds: 30 }
    }
}

impl TomlConfig {
    /// Load config from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CutsheetError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parse config from a TOML string, expanding `${VAR}` first.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CutsheetError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CutsheetError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        let l = &self.layout;
        for (field, value) in [
            ("layout.left_margin", l.left_margin),
            ("layout.plan_spacing", l.plan_spacing),
            ("layout.row_spacing", l.row_spacing),
            ("layout.item_spacing", l.item_spacing),
            ("layout.separator_spacing", l.separator_spacing),
            ("layout.group_spacing", l.group_spacing),
            ("layout.min_width", l.min_width),
            ("compose.spacing", self.compose.spacing),
        ] {
            validate_distance(field, value)?;
        }

        for (role, size) in [
            ("item", self.fallback.item),
            ("plan_info", self.fallback.plan_info),
            ("separator", self.fallback.separator),
        ] {
            validate_dimension(&format!("fallback.{}.width", role), size.width)?;
            validate_dimension(&format!("fallback.{}.height", role), size.height)?;
        }

        validate_non_empty_string("compose.output_prefix", &self.compose.output_prefix)?;
        validate_path("assets.dir", &self.assets.dir)?;
        validate_path("assets.separator_file", &self.assets.separator_file)?;

        validate_non_empty_string("storage.marker", &self.storage.marker)?;
        validate_extension("storage.extension", &self.storage.extension)?;
        match self.storage.backend {
            StorageBackend::Local => validate_path("storage.root", &self.storage.root)?,
            StorageBackend::Http => {
                let base_url = validate_required_field("storage.base_url", &self.storage.base_url)?;
                validate_url("storage.base_url", base_url)?;
            }
            StorageBackend::S3 => {
                let bucket = validate_required_field("storage.bucket", &self.storage.bucket)?;
                validate_non_empty_string("storage.bucket", bucket)?;
            }
        }

        validate_positive_number("fetch.timeout_seconds", self.fetch.timeout_seconds, 1)?;
        validate_range("fetch.timeout_seconds", self.fetch.timeout_seconds, 1, 3600)?;

        Ok(())
    }

    pub fn assets_dir(&self) -> PathBuf {
        PathBuf::from(&self.assets.dir)
    }
}

impl LayoutSettingsProvider for TomlConfig {
    fn layout_settings(&self) -> LayoutSettings {
        self.layout
    }

    fn fallback_presets(&self) -> FallbackPresets {
        self.fallback
    }

    fn compose_settings(&self) -> ComposeSettings {
        ComposeSettings {
            stacking: self.compose.stacking,
            spacing: self.compose.spacing,
        }
    }

    fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_seconds)
    }

    fn output_prefix(&self) -> &str {
        &self.compose.output_prefix
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
