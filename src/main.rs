use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Parser;
use revalue::utils::{logger, validation::Validate};
use revalue::{
    CliConfig, DeviceSpec, GeminiClient, ScraperProxy, ValuationEngine, ValuationOutcome,
    ValuationPipeline, ValuationRequest,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting revalue CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(3);
    }

    let config = match cli.load_valuator_config().and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Could not load configuration: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(3);
        }
    };

    let request = match build_request(&cli) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!("❌ {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(3);
        }
    };

    let fetcher = ScraperProxy::new(
        config.proxy.endpoint.clone(),
        config.proxy_api_key(),
        Duration::from_secs(config.proxy.timeout_seconds),
    )?;
    let analyzer = GeminiClient::new(&config.analysis, config.analysis_api_key());
    let pipeline = ValuationPipeline::new(fetcher, analyzer, &config)?;
    let engine = ValuationEngine::new(pipeline);

    match engine.run(request).await {
        Ok(outcome) => {
            let json = match &outcome {
                ValuationOutcome::Analysis(analysis) => serde_json::to_string_pretty(analysis)?,
                ValuationOutcome::Snapshot(snapshot) => serde_json::to_string_pretty(snapshot)?,
            };
            match &cli.output {
                Some(path) => {
                    std::fs::write(path, &json)?;
                    tracing::info!("📁 Result saved to {}", path.display());
                    println!("✅ Result saved to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Request failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // Internal distinctions are for the log; the user sees one
            // message per request category.
            let message = if cli.compare {
                "Could not fetch market data. Please try again.".to_string()
            } else {
                e.user_friendly_message()
            };
            eprintln!("❌ {}", message);
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                revalue::utils::error::ErrorSeverity::Low => 0,
                revalue::utils::error::ErrorSeverity::Medium => 2,
                revalue::utils::error::ErrorSeverity::High => 1,
                revalue::utils::error::ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn build_request(cli: &CliConfig) -> anyhow::Result<ValuationRequest> {
    if cli.compare {
        return Ok(ValuationRequest::Compare {
            brand: cli.brand.clone(),
            model: cli.model.clone(),
        });
    }

    let mut spec = DeviceSpec::new(cli.brand.clone(), cli.model.clone());
    spec.storage = cli.storage.clone();
    spec.memory = cli.memory.clone();
    spec.accessories = cli.accessories.clone();
    if let Some(path) = &cli.photo {
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("could not read photo {}: {}", path.display(), e))?;
        spec.photo_base64 = Some(STANDARD.encode(bytes));
    }
    Ok(ValuationRequest::Valuate(spec))
}
