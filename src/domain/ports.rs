use crate::core::composer::ComposeSettings;
use crate::core::fragment::FallbackPresets;
use crate::core::layout::LayoutSettings;
use crate::domain::model::{ComposeReport, StoredObject, UploadReceipt};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Remote (or local) object store holding the item drawings and receiving the
/// composed document.
pub trait DrawingStore: Send + Sync {
    /// Finds the drawing of `identifier` inside `folder`.
    fn resolve(
        &self,
        folder: &str,
        identifier: &str,
    ) -> impl std::future::Future<Output = Result<StoredObject>> + Send;
    fn fetch(
        &self,
        object: &StoredObject,
    ) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn upload(
        &self,
        folder: &str,
        name: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<UploadReceipt>> + Send;
}

pub trait LayoutSettingsProvider: Send + Sync {
    fn layout_settings(&self) -> LayoutSettings;
    fn fallback_presets(&self) -> FallbackPresets;
    fn compose_settings(&self) -> ComposeSettings;
    fn fetch_timeout(&self) -> Duration;
    fn output_prefix(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: Send;
    type Transformed: Send;

    async fn extract(&self) -> Result<Self::Extracted>;
    async fn transform(&self, data: Self::Extracted) -> Result<Self::Transformed>;
    async fn load(&self, result: Self::Transformed) -> Result<ComposeReport>;
}

/// Whether a stored object name is a drawing of `identifier`: it starts with
/// the identifier, contains `marker` somewhere after it and ends with
/// `.{extension}` (extension compared case-insensitively).
pub fn matches_item_object(name: &str, identifier: &str, marker: &str, extension: &str) -> bool {
    let Some(rest) = name.strip_prefix(identifier) else {
        return false;
    };
    let suffix = format!(".{}", extension.to_ascii_lowercase());
    if !name.to_ascii_lowercase().ends_with(&suffix) {
        return false;
    }
    rest.contains(marker)
}

/// Picks the drawing of `identifier` among `objects`. Several matches resolve
/// to the lexicographically smallest name.
pub fn select_item_object<I>(
    objects: I,
    identifier: &str,
    marker: &str,
    extension: &str,
) -> Option<StoredObject>
where
    I: IntoIterator<Item = StoredObject>,
{
    objects
        .into_iter()
        .filter(|o| matches_item_object(&o.name, identifier, marker, extension))
        .min_by(|a, b| a.name.cmp(&b.name))
}

/// Marker and extension every item drawing name carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPattern {
    pub marker: String,
    pub extension: String,
}

impl ObjectPattern {
    pub fn new(marker: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            extension: extension.into(),
        }
    }

    pub fn matches(&self, name: &str, identifier: &str) -> bool {
        matches_item_object(name, identifier, &self.marker, &self.extension)
    }

    pub fn select<I>(&self, objects: I, identifier: &str) -> Option<StoredObject>
    where
        I: IntoIterator<Item = StoredObject>,
    {
        select_item_object(objects, identifier, &self.marker, &self.extension)
    }
}

impl Default for ObjectPattern {
    fn default() -> Self {
        Self::new(".", "dxf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(name: &str) -> StoredObject {
        StoredObject {
            id: format!("id-{name}"),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_matches_item_object() {
        assert!(matches_item_object("A1_cut.dxf", "A1", "_cut", "dxf"));
        assert!(matches_item_object("A1_cut.DXF", "A1", "_cut", "dxf"));
        assert!(!matches_item_object("B1_cut.dxf", "A1", "_cut", "dxf"));
        assert!(!matches_item_object("A1.dxf", "A1", "_cut", "dxf"));
        assert!(!matches_item_object("A1_cut.png", "A1", "_cut", "dxf"));
        assert!(!matches_item_object("xA1_cut.dxf", "A1", "_cut", "dxf"));
    }

    #[test]
    fn test_smallest_match_wins() {
        let objects = vec![object("A10.dxf"), object("A1.dxf"), object("A1 (copy).dxf"), object("A1.png")];

        let picked = select_item_object(objects, "A1", ".", "dxf").unwrap();

        assert_eq!(picked.name, "A1 (copy).dxf");
    }

    #[test]
    fn test_no_match() {
        let objects = vec![object("B1.dxf")];
        assert!(select_item_object(objects, "A1", ".", "dxf").is_none());
    }
}
