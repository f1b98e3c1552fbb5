use crate::adapters::assets::AssetLibrary;
use crate::adapters::dxf::{read_drawing, write_drawing, DxfEntity};
use crate::core::composer::{compose, PlacedPlan, PlanLayout};
use crate::core::fragment::{Fragment, FragmentRole};
use crate::core::grouping::GroupingIndex;
use crate::core::layout::LayoutEngine;
use crate::core::sku::Sku;
use crate::domain::model::{
    ComposeReport, ComposeRequest, FailedItem, FailureReason, ItemSpec, PlanSpec,
};
use crate::domain::ports::{DrawingStore, LayoutSettingsProvider, Pipeline};
use crate::utils::error::{CutsheetError, Result};

/// Everything fetched for one plan, ready for layout.
pub struct ExtractedPlan {
    pub name: String,
    pub index: GroupingIndex<DxfEntity>,
    pub plan_info: Option<Fragment<DxfEntity>>,
    pub failed: Vec<FailedItem>,
}

/// The composed document, serialized and waiting for upload.
#[derive(Debug, Clone)]
pub struct ComposedOutput {
    pub output_name: String,
    pub document: Vec<u8>,
    pub plans: Vec<PlacedPlan>,
    pub skipped_plans: Vec<String>,
    pub failed_items: Vec<FailedItem>,
    pub width: f64,
    pub height: f64,
}

pub struct ComposePipeline<S: DrawingStore, C: LayoutSettingsProvider> {
    pub(crate) store: S,
    pub(crate) config: C,
    pub(crate) request: ComposeRequest,
    pub(crate) assets: AssetLibrary,
    pub(crate) engine: LayoutEngine<DxfEntity>,
}

impl<S: DrawingStore, C: LayoutSettingsProvider> ComposePipeline<S, C> {
    /// Builds the pipeline and loads the separator bar from `assets` once.
    pub async fn new(store: S, config: C, request: ComposeRequest, assets: AssetLibrary) -> Self {
        let separator = assets.separator().await;
        if separator.is_none() {
            tracing::warn!("no separator bar available, groups will be split by plain spacing");
        }
        Self::with_separator(store, config, request, assets, separator)
    }

    pub fn with_separator(
        store: S,
        config: C,
        request: ComposeRequest,
        assets: AssetLibrary,
        separator: Option<Fragment<DxfEntity>>,
    ) -> Self {
        let engine = LayoutEngine::new(config.layout_settings(), separator);
        Self {
            store,
            config,
            request,
            assets,
            engine,
        }
    }

    pub fn request(&self) -> &ComposeRequest {
        &self.request
    }

    async fn extract_plan(&self, plan: &PlanSpec) -> ExtractedPlan {
        let mut index = GroupingIndex::new();
        let mut failed = Vec::new();

        for item in &plan.items {
            let outcome = match Sku::parse(&item.sku) {
                Ok(sku) => self
                    .fetch_item(&plan.source_folder, item)
                    .await
                    .map(|fragment| index.classify(fragment, &sku)),
                Err(e) => Err(e),
            };

            if let Err(e) = outcome {
                let reason = FailureReason::from_error(&e);
                if reason == FailureReason::CorruptDrawing {
                    tracing::error!("plan '{}': item '{}' skipped: {}", plan.name, item.item_id, e);
                } else {
                    tracing::warn!("plan '{}': item '{}' skipped: {}", plan.name, item.item_id, e);
                }
                failed.push(FailedItem {
                    plan: plan.name.clone(),
                    item_id: item.item_id.clone(),
                    sku: item.sku.clone(),
                    reason,
                });
            }
        }

        let plan_info = self.assets.plan_info(&plan.name).await;
        tracing::info!(
            "plan '{}': {} of {} items ready, plan info {}",
            plan.name,
            index.len(),
            plan.items.len(),
            if plan_info.is_some() { "found" } else { "missing" }
        );

        ExtractedPlan {
            name: plan.name.clone(),
            index,
            plan_info,
            failed,
        }
    }

    /// Resolves, downloads and parses one item drawing within the fetch timeout.
    async fn fetch_item(&self, folder: &str, item: &ItemSpec) -> Result<Fragment<DxfEntity>> {
        let timeout = self.config.fetch_timeout();
        let download = async {
            let object = self.store.resolve(folder, &item.item_id).await?;
            tracing::debug!("item '{}' resolved to '{}'", item.item_id, object.name);
            self.store.fetch(&object).await
        };

        let bytes = tokio::time::timeout(timeout, download)
            .await
            .map_err(|_| CutsheetError::FetchTimeout {
                identifier: item.item_id.clone(),
                seconds: timeout.as_secs(),
            })??;

        let drawing = read_drawing(&bytes)?;
        Ok(Fragment::load(
            &drawing.entities,
            self.config.fallback_presets().item,
            FragmentRole::Item,
            item.sku.clone(),
        ))
    }

    fn output_name(&self, plans: &[PlacedPlan]) -> String {
        match &self.request.output_filename {
            Some(name) if name.to_ascii_lowercase().ends_with(".dxf") => name.clone(),
            Some(name) => format!("{}.dxf", name),
            None => {
                let names: Vec<&str> = plans.iter().map(|p| p.name.as_str()).collect();
                format!(
                    "{} {} {}.dxf",
                    self.config.output_prefix(),
                    names.join("_"),
                    chrono::Local::now().format("%d-%m-%Y_%H%M%S")
                )
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: DrawingStore, C: LayoutSettingsProvider> Pipeline for ComposePipeline<S, C> {
    type Extracted = Vec<ExtractedPlan>;
    type Transformed = ComposedOutput;

    async fn extract(&self) -> Result<Vec<ExtractedPlan>> {
        let mut plans = Vec::with_capacity(self.request.plans.len());
        for plan in &self.request.plans {
            plans.push(self.extract_plan(plan).await);
        }
        Ok(plans)
    }

    async fn transform(&self, data: Vec<ExtractedPlan>) -> Result<ComposedOutput> {
        let mut layouts = Vec::with_capacity(data.len());
        let mut failed_items = Vec::new();

        for plan in data {
            let layout = self.engine.layout(&plan.index, plan.plan_info.as_ref());
            if layout.bounds_estimated {
                tracing::error!("plan '{}' has estimated bounds, check its drawings", plan.name);
            }
            failed_items.extend(plan.failed);
            layouts.push(PlanLayout {
                name: plan.name,
                layout,
            });
        }

        let document = compose(layouts, &self.config.compose_settings())?;
        let bytes = write_drawing(&document.entities)?;
        let output_name = self.output_name(&document.plans);

        tracing::info!(
            "composed {} plan(s) into '{}' ({:.1} x {:.1} mm)",
            document.plans.len(),
            output_name,
            document.width,
            document.height
        );

        Ok(ComposedOutput {
            output_name,
            document: bytes,
            plans: document.plans,
            skipped_plans: document.skipped_plans,
            failed_items,
            width: document.width,
            height: document.height,
        })
    }

    async fn load(&self, result: ComposedOutput) -> Result<ComposeReport> {
        let destination = self
            .store
            .upload(
                &self.request.destination_folder,
                &result.output_name,
                &result.document,
            )
            .await?;
        tracing::info!("uploaded '{}' to {}", result.output_name, destination.url);

        Ok(ComposeReport {
            destination,
            output_name: result.output_name,
            failed_items: result.failed_items,
            skipped_plans: result.skipped_plans,
            plans: result.plans,
            width: result.width,
            height: result.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::dxf::fixtures;
    use crate::core::composer::ComposeSettings;
    use crate::core::fragment::FallbackPresets;
    use crate::core::layout::LayoutSettings;
    use crate::domain::model::{StoredObject, UploadReceipt};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Settings {
        timeout: Duration,
    }

    impl LayoutSettingsProvider for Settings {
        fn layout_settings(&self) -> LayoutSettings {
            LayoutSettings::default()
        }

        fn fallback_presets(&self) -> FallbackPresets {
            FallbackPresets::default()
        }

        fn compose_settings(&self) -> ComposeSettings {
            ComposeSettings::default()
        }

        fn fetch_timeout(&self) -> Duration {
            self.timeout
        }

        fn output_prefix(&self) -> &str {
            "cutting-plan"
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        objects: HashMap<String, Vec<u8>>,
        slow: Vec<String>,
        uploads: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    impl MemoryStore {
        fn with(mut self, id: &str, bytes: Vec<u8>) -> Self {
            self.objects.insert(id.to_string(), bytes);
            self
        }
    }

    impl DrawingStore for MemoryStore {
        async fn resolve(&self, folder: &str, identifier: &str) -> Result<StoredObject> {
            if self.slow.iter().any(|s| s == identifier) {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if self.objects.contains_key(identifier) {
                Ok(StoredObject {
                    id: identifier.to_string(),
                    name: format!("{}.dxf", identifier),
                })
            } else {
                Err(CutsheetError::ObjectNotFound {
                    folder: folder.to_string(),
                    identifier: identifier.to_string(),
                })
            }
        }

        async fn fetch(&self, object: &StoredObject) -> Result<Vec<u8>> {
            Ok(self.objects[&object.id].clone())
        }

        async fn upload(&self, folder: &str, name: &str, data: &[u8]) -> Result<UploadReceipt> {
            self.uploads
                .lock()
                .unwrap()
                .push((folder.to_string(), name.to_string(), data.to_vec()));
            Ok(UploadReceipt {
                id: name.to_string(),
                url: format!("memory://{}/{}", folder, name),
            })
        }
    }

    fn request(items: &[(&str, &str)]) -> ComposeRequest {
        ComposeRequest {
            plans: vec![PlanSpec {
                name: "01".to_string(),
                source_folder: "orders".to_string(),
                items: items
                    .iter()
                    .map(|(id, sku)| ItemSpec {
                        item_id: id.to_string(),
                        sku: sku.to_string(),
                    })
                    .collect(),
            }],
            destination_folder: "out".to_string(),
            output_filename: Some("plan-01".to_string()),
        }
    }

    fn pipeline(
        store: MemoryStore,
        request: ComposeRequest,
        timeout: Duration,
        assets: &TempDir,
    ) -> ComposePipeline<MemoryStore, Settings> {
        let library = AssetLibrary::new(assets.path(), "separator.dxf", FallbackPresets::default());
        ComposePipeline::with_separator(store, Settings { timeout }, request, library, None)
    }

    async fn run(pipeline: &ComposePipeline<MemoryStore, Settings>) -> Result<ComposeReport> {
        let extracted = pipeline.extract().await?;
        let composed = pipeline.transform(extracted).await?;
        pipeline.load(composed).await
    }

    #[tokio::test]
    async fn test_skips_are_reported_not_fatal() {
        let store = MemoryStore::default()
            .with("A1", fixtures::rectangle(0.0, 0.0, 100.0, 200.0))
            .with("A3", b"not a dxf".to_vec());
        let request = request(&[
            ("A1", "PLAC-3010-2FH-AC-DOU-070-00001"),
            ("A2", "PLAC-3010-2FH-AC-DOU-070-00002"),
            ("A3", "PLAC-3010-2FH-AC-DOU-070-00003"),
            ("A4", "PLAC-3010-2FH"),
        ]);
        let assets = TempDir::new().unwrap();
        let pipeline = pipeline(store, request, Duration::from_secs(5), &assets);

        let report = run(&pipeline).await.unwrap();

        assert_eq!(report.placed_items(), 1);
        assert_eq!(report.failed_ids(), vec!["A2", "A3", "A4"]);
        let reasons: Vec<FailureReason> = report.failed_items.iter().map(|f| f.reason).collect();
        assert_eq!(
            reasons,
            vec![
                FailureReason::NotFound,
                FailureReason::CorruptDrawing,
                FailureReason::InvalidSku
            ]
        );
        assert_eq!(report.output_name, "plan-01.dxf");
        assert_eq!(report.destination.url, "memory://out/plan-01.dxf");

        let uploads = pipeline.store.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        let reread = read_drawing(&uploads[0].2).unwrap();
        assert_eq!(reread.len(), 4);
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out() {
        let mut store = MemoryStore::default()
            .with("A1", fixtures::rectangle(0.0, 0.0, 100.0, 200.0))
            .with("A2", fixtures::rectangle(0.0, 0.0, 100.0, 200.0));
        store.slow.push("A2".to_string());
        let request = request(&[
            ("A1", "PLAC-3010-2FH-AC-DOU-070-00001"),
            ("A2", "PLAC-3010-2FH-AC-DOU-070-00002"),
        ]);
        let assets = TempDir::new().unwrap();
        let pipeline = pipeline(store, request, Duration::from_millis(50), &assets);

        let report = run(&pipeline).await.unwrap();

        assert_eq!(report.placed_items(), 1);
        assert_eq!(report.failed_items.len(), 1);
        assert_eq!(report.failed_items[0].reason, FailureReason::Timeout);
    }

    #[tokio::test]
    async fn test_everything_failing_is_an_error() {
        let request = request(&[("A1", "PLAC-3010-2FH")]);
        let assets = TempDir::new().unwrap();
        let pipeline = pipeline(MemoryStore::default(), request, Duration::from_secs(5), &assets);

        let err = run(&pipeline).await.unwrap_err();

        assert!(matches!(err, CutsheetError::EmptyComposition { plans: 1 }));
        assert!(pipeline.store.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generated_output_name() {
        let mut request = request(&[("A1", "PLAC-3010-2FH-AC-DOU-070-00001")]);
        request.output_filename = None;
        let store = MemoryStore::default().with("A1", fixtures::rectangle(0.0, 0.0, 10.0, 10.0));
        let assets = TempDir::new().unwrap();
        let pipeline = pipeline(store, request, Duration::from_secs(5), &assets);

        let report = run(&pipeline).await.unwrap();

        assert!(report.output_name.starts_with("cutting-plan 01 "));
        assert!(report.output_name.ends_with(".dxf"));
    }

    #[tokio::test]
    async fn test_plan_info_is_placed_above_items() {
        let assets = TempDir::new().unwrap();
        std::fs::write(
            assets.path().join("01.dxf"),
            fixtures::rectangle(0.0, 0.0, 236.0, 21.5),
        )
        .unwrap();
        let store = MemoryStore::default().with("A1", fixtures::rectangle(0.0, 0.0, 100.0, 200.0));
        let request = request(&[("A1", "PLAC-3010-2FH-AC-DOU-070-00001")]);
        let pipeline = pipeline(store, request, Duration::from_secs(5), &assets);

        let report = run(&pipeline).await.unwrap();

        assert_eq!(report.plans.len(), 1);
        assert_eq!(report.plans[0].placed_items, 1);
        // item row (200) + plan spacing (100) + plan info (21.5)
        assert!((report.height - 321.5).abs() < 1e-6);
        assert!((report.width - 236.0).abs() < 1e-6);
    }
}
