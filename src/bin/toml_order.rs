use clap::Parser;
use portfolio_order::config::toml_config::TomlConfig;
use portfolio_order::domain::ports::{ConfigProvider, FetchFailurePolicy};
use portfolio_order::utils::error::ErrorSeverity;
use portfolio_order::utils::{logger, validation::Validate};
use portfolio_order::{build_source, LocalStorage, OrderEngine, PortfolioPipeline};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "toml-order")]
#[command(about = "Orders the portfolio catalogues using a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "portfolio-order.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the shuffle seed from config
    #[arg(long)]
    seed: Option<u64>,

    /// Show what would be fetched and written without doing it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    let verbose = args.verbose
        || config
            .monitoring
            .as_ref()
            .and_then(|m| m.log_level.as_deref())
            .is_some_and(|level| level.eq_ignore_ascii_case("debug"));
    logger::init_logger(verbose, config.json_logs());
    tracing::info!("🚀 Starting TOML-based portfolio ordering");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(seed) = args.seed {
        let order = config.order.get_or_insert(portfolio_order::config::toml_config::OrderConfig {
            sections: None,
            seed: None,
        });
        order.seed = Some(seed);
        tracing::info!("🔧 Shuffle seed overridden to: {}", seed);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be fetched or written");
        return Ok(());
    }

    let monitor_enabled = args
        .monitor
        .unwrap_or_else(|| config.is_monitoring_enabled());

    let directory = if config.is_file_source() {
        config.source.directory.clone()
    } else {
        None
    };
    let source = build_source(
        config.api_endpoint(),
        directory.as_deref(),
        Duration::from_secs(config.timeout_seconds()),
        config.source.headers.as_ref(),
    )?;

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = PortfolioPipeline::new(storage, config, source);
    let engine = OrderEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            println!("✅ Portfolio ordered, output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    println!("📋 Configuration Summary:");
    println!("  Portfolio: {}", config.portfolio.name);
    if config.is_file_source() {
        println!(
            "  Source: files in {}",
            config.source.directory.as_deref().unwrap_or("?")
        );
    } else {
        println!("  Source: {}", config.api_endpoint());
    }
    let sections: Vec<&str> = config.sections().iter().map(|s| s.resource()).collect();
    println!("  Sections: {}", sections.join(", "));
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.load.output_formats.join(", "));

    let options = config.output_options();
    if options.zip {
        println!("  Compression: portfolio_order.zip");
    }
    match config.shuffle_seed() {
        Some(seed) => println!("  Shuffle: seeded ({})", seed),
        None => println!("  Shuffle: random"),
    }
    if config.on_fetch_failure() == FetchFailurePolicy::Abort {
        println!("  On fetch failure: abort");
    }
    println!("  Concurrent Requests: {}", config.concurrent_requests());
    println!();
}
