use clap::Parser;
use kenya_debt_etl::config::{dry_run::dry_run_report, load_env_file, LogFormat};
use kenya_debt_etl::core::LoadSummary;
use kenya_debt_etl::utils::{logger, validation::Validate};
use kenya_debt_etl::{
    CliConfig, DebtPipeline, EtlEngine, LocalStorage, PostgresStore, TomlConfig, WorldBankClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 讀取 .env（DB_* 憑證），需在解析任何配置之前
    let env_file = load_env_file();
    let cli = CliConfig::parse();

    // 初始化日誌
    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting kenya-debt-etl");
    if let Some(path) = &env_file {
        tracing::debug!("Loaded environment from {}", path.display());
    }
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入 TOML 配置
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            match TomlConfig::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    eprintln!("💡 Make sure the file exists and is valid TOML format");
                    std::process::exit(e.exit_code());
                }
            }
        }
        None => TomlConfig::default(),
    };
    cli.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    display_config_summary(&config, &cli);

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        print!("{}", dry_run_report(&config, cli.skip_database));
        println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
        return Ok(());
    }

    match run(&cli, config).await {
        Ok(summary) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            if summary.database_skipped {
                println!("🐘 Database: skipped");
            } else {
                println!(
                    "🐘 Database: {} records ({} inserted, {} updated)",
                    summary.records_loaded, summary.inserted, summary.updated
                );
            }
            if let Some(path) = &summary.export_path {
                println!("📁 Export saved to: {}", path);
            }
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let code = e.exit_code();
            if code > 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}

async fn run(cli: &CliConfig, config: TomlConfig) -> kenya_debt_etl::Result<LoadSummary> {
    let source = WorldBankClient::new(config.source.clone())?;

    let store = if cli.skip_database {
        None
    } else {
        let database = config.resolve_database()?;
        Some(PostgresStore::connect(&database).await?)
    };

    let storage = LocalStorage::new(config.output_path());
    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = DebtPipeline::new(source, store, storage, config);
    EtlEngine::new_with_monitoring(pipeline, monitor_enabled)
        .run()
        .await
}

fn display_config_summary(config: &TomlConfig, cli: &CliConfig) {
    println!("📋 Configuration Summary:");
    println!("  Pipeline: {}", config.pipeline.name);
    println!(
        "  Indicator: {} ({})",
        config.source.indicator, config.source.country_code
    );
    println!("  Years: {}", config.source.date_range());
    println!("  Missing values: {:?}", config.transform.missing_values);
    match &config.database {
        Some(db) => println!("  Database: {}:{}/{} ({})", db.host, db.port, db.name, db.table),
        None if cli.skip_database => println!("  Database: skipped"),
        None => println!("  Database: from DB_* environment variables"),
    }
    if let Some(export) = config.export_config() {
        println!(
            "  Export: {}/{} ({})",
            config.output_path(),
            export.filename,
            export.formats.join(", ")
        );
    }
    if cli.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}
