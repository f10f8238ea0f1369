use clap::Parser;
use portfolio_order::domain::ports::RecordSource;
use portfolio_order::utils::error::{ErrorSeverity, OrderError};
use portfolio_order::utils::{logger, validation::Validate};
use portfolio_order::{
    build_source, Cli, CliConfig, Command, LocalStorage, OrderEngine, PortfolioPipeline, Section,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_logger(cli.config.verbose, cli.config.log_json);
    tracing::info!("Starting portfolio-order");
    tracing::debug!("CLI config: {:?}", cli.config);

    if let Err(e) = execute(cli).await {
        tracing::error!(
            "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
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

async fn execute(cli: Cli) -> Result<(), OrderError> {
    let config = cli.config;
    config.validate()?;

    let source = build_source(
        &config.api_base,
        config.source_dir.as_deref(),
        Duration::from_secs(config.timeout_seconds),
        None,
    )?;

    match cli.command.unwrap_or(Command::Order) {
        Command::Order => {
            let output_path = run_order(config, source, None).await?;
            println!("✅ Portfolio ordered, output saved to: {}", output_path);
        }
        Command::Show { section, id } => match source.get(section, &id).await? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => {
                return Err(OrderError::NotFoundError {
                    section: section.resource().to_string(),
                    id,
                })
            }
        },
        Command::Delete { section, id } => {
            source.delete(section, &id).await?;
            tracing::info!("🗑️ Deleted {} item {}", section, id);
            println!("🗑️ Deleted {} item {}", section, id);

            // 刪除後重新排序該區段
            let output_path = run_order(config, source, Some(vec![section])).await?;
            println!("✅ {} re-ordered, output saved to: {}", section, output_path);
        }
    }

    Ok(())
}

async fn run_order(
    config: CliConfig,
    source: Arc<dyn RecordSource>,
    only: Option<Vec<Section>>,
) -> Result<String, OrderError> {
    let monitor = config.monitor;
    if monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path.clone());
    let mut pipeline = PortfolioPipeline::new(storage, config, source);
    if let Some(sections) = only {
        pipeline = pipeline.with_sections(sections);
    }

    OrderEngine::new_with_monitoring(pipeline, monitor)
        .run()
        .await
}
