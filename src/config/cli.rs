use crate::config::toml_config::LoaderConfig;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "fragment-loader")]
#[command(about = "Expand collapse-icon triggers on a page by fetching their fragments")]
pub struct CliConfig {
    /// Page description (TOML) with the elements to operate on
    #[arg(long)]
    pub page: PathBuf,

    /// Loader settings (TOML); defaults apply when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Id of a trigger element to click; repeat to click several times
    #[arg(long = "click", value_name = "ELEMENT_ID")]
    pub clicks: Vec<String>,

    /// Base URL for relative fragment sources, overriding page and config
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long, help = "Print the dispatch report as JSON instead of the page")]
    pub json: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Loader settings from `--config` with command-line overrides applied.
    pub fn loader_config(&self) -> Result<LoaderConfig> {
        let mut config = match &self.config {
            Some(path) => LoaderConfig::from_file(path)?,
            None => LoaderConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }

        Ok(config)
    }
}
