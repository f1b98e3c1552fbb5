pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::assets::AssetLibrary;
pub use adapters::dxf::{read_drawing, write_drawing, DxfEntity};
pub use adapters::http::HttpStore;
pub use app::pipelines::ComposePipeline;
pub use config::cli::LocalStore;
#[cfg(feature = "cli")]
pub use config::CliConfig;
#[cfg(feature = "s3")]
pub use config::s3::S3Store;
pub use config::toml_config::TomlConfig;
pub use core::etl::ComposeEngine;
pub use domain::model::{ComposeReport, ComposeRequest};
pub use utils::error::{CutsheetError, Result};
