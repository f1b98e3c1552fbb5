use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "cutsheet")]
#[command(about = "Lays out item drawings on DXF cutting sheets")]
pub struct CliConfig {
    #[arg(long, help = "TOML configuration file (defaults apply when omitted)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "JSON compose request")]
    pub request: PathBuf,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Report phase timings with memory and CPU usage")]
    pub monitor: bool,

    #[arg(long, help = "Validate the request and print the plans without fetching anything")]
    pub dry_run: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(config) = &self.config {
            validate_path("config", &config.to_string_lossy())?;
        }
        validate_path("request", &self.request.to_string_lossy())
    }
}
