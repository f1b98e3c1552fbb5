use clap::Parser;
use cutsheet::config::toml_config::StorageBackend;
use cutsheet::core::sku::Sku;
use cutsheet::domain::ports::DrawingStore;
use cutsheet::utils::error::ErrorSeverity;
use cutsheet::utils::{logger, validation::Validate};
use cutsheet::{
    AssetLibrary, CliConfig, ComposeEngine, ComposePipeline, ComposeReport, ComposeRequest,
    CutsheetError, HttpStore, LocalStore, TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting cutsheet");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        exit_with(&e, "Invalid command line");
    }

    let config = match cli.config.as_ref().map(TomlConfig::from_file) {
        Some(Ok(config)) => config,
        Some(Err(e)) => exit_with(&e, "Cannot load configuration"),
        None => TomlConfig::default(),
    };
    if let Err(e) = config.validate() {
        exit_with(&e, "Configuration validation failed");
    }

    let request = match ComposeRequest::from_file(&cli.request) {
        Ok(request) => request,
        Err(e) => exit_with(&e, "Invalid compose request"),
    };

    let assets = AssetLibrary::new(
        config.assets_dir(),
        config.assets.separator_file.clone(),
        config.fallback,
    )
    .with_extension(&config.storage.extension);

    if cli.dry_run {
        print_plan_summary(&request, &assets);
        return Ok(());
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pattern = config.storage.pattern();
    let result = match config.storage.backend {
        StorageBackend::Local => {
            let store = LocalStore::new(&config.storage.root, pattern);
            compose(store, config.clone(), request, assets, cli.monitor).await
        }
        StorageBackend::Http => {
            let base_url = config.storage.base_url.clone().unwrap_or_default();
            match HttpStore::new(&base_url, pattern) {
                Ok(store) => compose(store, config.clone(), request, assets, cli.monitor).await,
                Err(e) => Err(e),
            }
        }
        #[cfg(feature = "s3")]
        StorageBackend::S3 => {
            let store = cutsheet::S3Store::from_env(
                config.storage.bucket.clone().unwrap_or_default(),
                config.storage.region.clone(),
                pattern,
            )
            .await;
            compose(store, config.clone(), request, assets, cli.monitor).await
        }
        #[cfg(not(feature = "s3"))]
        StorageBackend::S3 => Err(CutsheetError::ConfigError {
            message: "storage.backend = \"s3\" requires building with the `s3` feature".to_string(),
        }),
    };

    match result {
        Ok(report) => {
            tracing::info!("✅ Composition completed successfully!");
            tracing::info!("📁 Output saved to: {}", report.destination.url);
            for failed in &report.failed_items {
                tracing::warn!(
                    "item '{}' of plan '{}' was not placed ({:?})",
                    failed.item_id,
                    failed.plan,
                    failed.reason
                );
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Err(e) => exit_with(&e, "Composition failed"),
    }

    Ok(())
}

async fn compose<S: DrawingStore>(
    store: S,
    config: TomlConfig,
    request: ComposeRequest,
    assets: AssetLibrary,
    monitor: bool,
) -> cutsheet::Result<ComposeReport> {
    let pipeline = ComposePipeline::new(store, config, request, assets).await;
    let engine = ComposeEngine::new_with_monitoring(pipeline, monitor);
    engine.run().await
}

fn print_plan_summary(request: &ComposeRequest, assets: &AssetLibrary) {
    println!(
        "{} plan(s), {} item(s), destination '{}'",
        request.plans.len(),
        request.item_count(),
        request.destination_folder
    );
    for plan in &request.plans {
        let invalid: Vec<&str> = plan
            .items
            .iter()
            .filter(|item| Sku::parse(&item.sku).is_err())
            .map(|item| item.item_id.as_str())
            .collect();
        let plan_info = if assets.plan_info_path(&plan.name).is_file() {
            "present"
        } else {
            "missing"
        };
        println!(
            "  {}: {} item(s) from '{}', plan info {}, invalid SKUs: {}",
            plan.name,
            plan.items.len(),
            plan.source_folder,
            plan_info,
            if invalid.is_empty() {
                "none".to_string()
            } else {
                invalid.join(", ")
            }
        );
    }
}

fn exit_with(e: &CutsheetError, context: &str) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
