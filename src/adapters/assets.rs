use crate::adapters::dxf::{read_drawing, DxfEntity};
use crate::core::fragment::{FallbackPresets, Fragment, FragmentRole};
use std::path::{Path, PathBuf};

/// Local directory of shared drawings: one `<plan>.<extension>` plan-info
/// stamp per plan plus the separator bar.
#[derive(Debug, Clone)]
pub struct AssetLibrary {
    dir: PathBuf,
    separator_file: String,
    extension: String,
    presets: FallbackPresets,
}

impl AssetLibrary {
    pub fn new(dir: impl Into<PathBuf>, separator_file: impl Into<String>, presets: FallbackPresets) -> Self {
        Self {
            dir: dir.into(),
            separator_file: separator_file.into(),
            extension: "dxf".to_string(),
            presets,
        }
    }

    /// Drawing extension of the plan-info files, without the dot.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn plan_info_path(&self, plan: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", plan, self.extension))
    }

    /// The plan-info fragment of `plan`, or `None` when it is missing or unreadable.
    pub async fn plan_info(&self, plan: &str) -> Option<Fragment<DxfEntity>> {
        let path = self.plan_info_path(plan);
        self.load(&path, FragmentRole::PlanInfo, plan).await
    }

    /// The separator bar, or `None` when it is missing or unreadable.
    pub async fn separator(&self) -> Option<Fragment<DxfEntity>> {
        let path = self.dir.join(&self.separator_file);
        self.load(&path, FragmentRole::Separator, "separator").await
    }

    async fn load(&self, path: &Path, role: FragmentRole, label: &str) -> Option<Fragment<DxfEntity>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no {:?} drawing at {}", role, path.display());
                return None;
            }
            Err(e) => {
                tracing::error!("cannot read {}: {}", path.display(), e);
                return None;
            }
        };

        match read_drawing(&bytes) {
            Ok(drawing) => Some(Fragment::load(
                &drawing.entities,
                self.presets.for_role(role),
                role,
                label,
            )),
            Err(e) => {
                tracing::error!("{} is not a valid DXF drawing, ignoring it: {}", path.display(), e);
                None
            }
        }
    }
}
