use clap::Parser;
use vedic_proxy::config::cli::Command;
use vedic_proxy::utils::{logger, validation::Validate};
use vedic_proxy::domain::model::BirthQuery;
use vedic_proxy::{AppConfig, AstroError, CliConfig, ProxyService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting vedic-proxy CLI");

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::from_env(),
    };

    let config = match config {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    if cli.verbose {
        tracing::debug!("App config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    let service = match ProxyService::from_config(&config) {
        Ok(service) => service,
        Err(e) => fail(&e),
    };

    if let Err(e) = run(&service, cli.command).await {
        tracing::error!("❌ Command failed: {} (status {})", e, e.status_code());
        fail(&e);
    }

    Ok(())
}

async fn run(service: &ProxyService, command: Command) -> vedic_proxy::Result<()> {
    match command {
        Command::Profile { birth, question } => {
            let query = BirthQuery::from(birth);
            let report = service.analyze(&query, question.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Chart { birth, output } => {
            let svg = service.chart(&BirthQuery::from(birth)).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, svg)?;
                    tracing::info!("📁 Chart saved to: {}", path.display());
                }
                None => println!("{}", svg),
            }
        }
        Command::Proxy { path, query } => {
            let forwarded = service.forward(&path, query.as_deref()).await?;
            if !(200..300).contains(&forwarded.status) {
                tracing::warn!("⚠️ Upstream responded with {}", forwarded.status);
            }
            println!("{}", forwarded.body);
        }
    }

    Ok(())
}

/// 輸出使用者可讀的錯誤並依類別決定退出碼
fn fail(e: &AstroError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());

    let exit_code = match e {
        e if e.is_configuration() => 3,
        AstroError::RequestError { .. } => 2,
        _ => 1,
    };
    std::process::exit(exit_code);
}
