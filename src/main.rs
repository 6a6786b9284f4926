//! NOVA — sportsbook odds consensus and pick ledger
//!
//! Entry point. Loads configuration, initialises structured logging and
//! runs one batch over the configured quote snapshot.

use anyhow::Result;
use std::path::Path;
use tracing::{error, info};

use nova::config::AppConfig;
use nova::engine::Pipeline;

const BANNER: &str = r#"
 _   _  _____     ___
| \ | |/ _ \ \   / / \
|  \| | | | \ \ / / _ \
| |\  | |_| |\ V / ___ \
|_| \_|\___/  \_/_/   \_\

  Sharp consensus, edges and Kelly sizing
  v0.1.0 — Batch run
"#;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path = std::env::var("NOVA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = if Path::new(&config_path).exists() {
        AppConfig::load(&config_path)?
    } else {
        info!(path = %config_path, "No config file found, using built-in defaults");
        AppConfig::default()
    };

    println!("{BANNER}");
    info!(
        snapshot = %cfg.files.snapshot,
        ledger = %cfg.files.ledger,
        starting_bankroll = cfg.pipeline.starting_bankroll,
        min_edge = cfg.pipeline.min_edge,
        log_deviations = cfg.pipeline.log_deviations,
        "NOVA starting up"
    );

    match Pipeline::new(&cfg).run() {
        Ok(report) => {
            info!(
                picks = report.picks_generated,
                ledger = report.ledger_size,
                "NOVA run finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "NOVA run aborted");
            Err(e)
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("nova=info"));

    let json_logging = std::env::var("NOVA_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
