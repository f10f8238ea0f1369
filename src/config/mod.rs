pub mod cli;
pub mod toml_config;

use crate::domain::model::Section;
use crate::domain::ports::{ConfigProvider, FetchFailurePolicy, OutputOptions};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "http://localhost:8080";
pub const OUTPUT_FORMATS: [&str; 2] = ["json", "csv"];

#[derive(Debug, Clone, Parser)]
#[command(name = "portfolio-order")]
#[command(about = "Fetches the portfolio catalogues and writes them in display order")]
pub struct Cli {
    #[command(flatten)]
    pub config: CliConfig,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Fetch, order and write every selected section (default)
    Order,
    /// Print one record as JSON
    Show { section: Section, id: String },
    /// Delete one record, then re-order its section
    Delete { section: Section, id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Args)]
pub struct CliConfig {
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(long, help = "Read <resource>.json files from this directory instead of the API")]
    pub source_dir: Option<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "experiencias,formaciones,habilidades,proyectos"
    )]
    pub sections: Vec<Section>,

    #[arg(long, value_delimiter = ',', default_value = "json")]
    pub formats: Vec<String>,

    #[arg(long, help = "Bundle the output files into portfolio_order.zip")]
    pub zip: bool,

    #[arg(long, help = "Seed the shuffle for reproducible output")]
    pub seed: Option<u64>,

    #[arg(long, default_value = "4")]
    pub concurrent_requests: usize,

    #[arg(long, default_value = "10")]
    pub timeout_seconds: u64,

    #[arg(long, help = "Abort instead of ordering an empty section when a fetch fails")]
    pub fail_on_fetch_error: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub log_json: bool,

    #[arg(long, help = "Log process resource usage per phase")]
    pub monitor: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            source_dir: None,
            output_path: "./output".to_string(),
            sections: Section::ALL.to_vec(),
            formats: vec!["json".to_string()],
            zip: false,
            seed: None,
            concurrent_requests: 4,
            timeout_seconds: 10,
            fail_on_fetch_error: false,
            verbose: false,
            log_json: false,
            monitor: false,
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.source_dir {
            Some(dir) => validation::validate_path("source_dir", dir)?,
            None => validation::validate_url("api_base", &self.api_base)?,
        }
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_positive_number("concurrent_requests", self.concurrent_requests, 1)?;
        validation::validate_positive_number(
            "timeout_seconds",
            usize::try_from(self.timeout_seconds).unwrap_or(usize::MAX),
            1,
        )?;
        for format in &self.formats {
            validation::validate_one_of("formats", format, &OUTPUT_FORMATS)?;
        }
        Ok(())
    }
}

impl ConfigProvider for CliConfig {
    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn sections(&self) -> Vec<Section> {
        let mut sections = self.sections.clone();
        sections.sort();
        sections.dedup();
        sections
    }

    fn output_options(&self) -> OutputOptions {
        OutputOptions {
            csv: self.formats.iter().any(|f| f == "csv"),
            zip: self.zip,
        }
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }

    fn on_fetch_failure(&self) -> FetchFailurePolicy {
        if self.fail_on_fetch_error {
            FetchFailurePolicy::Abort
        } else {
            FetchFailurePolicy::Empty
        }
    }

    fn shuffle_seed(&self) -> Option<u64> {
        self.seed
    }
}
