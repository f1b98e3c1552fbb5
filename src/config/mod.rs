#[cfg(feature = "cli")]
mod args;
pub mod cli;
#[cfg(feature = "s3")]
pub mod s3;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use args::CliConfig;
