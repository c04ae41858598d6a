use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use blade_core::config::BladeConfig;
use cli::args::{Cli, GlobalArgs};
use cli::commands::{dispatch, exit_codes};

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_writer(std::io::stderr) // stdout carries the response JSON
        .init();
}

fn resolve_config(global: &GlobalArgs) -> anyhow::Result<BladeConfig> {
    let mut cfg = BladeConfig::load(global.config.as_deref())?;
    if let Some(db) = &global.db {
        cfg.db_path = db.clone();
    }
    if let Some(dir) = &global.script_path {
        cfg.script_path = dir.clone();
    }
    Ok(cfg)
}

fn main() {
    let cli = Cli::parse();
    let cfg = match resolve_config(&cli.global) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("fatal: {e}");
            std::process::exit(exit_codes::CONFIG_ERROR);
        }
    };

    init_logging(&cfg.log_level);
    tracing::debug!(event = "cli_start", config = ?cfg);

    let code = match dispatch(cli, &cfg) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(event = "fatal", error = %format!("{e:#}"));
            eprintln!("fatal: {e:#}");
            exit_codes::CONFIG_ERROR
        }
    };
    std::process::exit(code);
}
