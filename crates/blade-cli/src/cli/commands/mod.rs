use super::args::*;
use blade_core::config::BladeConfig;
use blade_core::engine::Runner;
use blade_core::exec::{default_registry, LocalChannel};
use blade_core::storage::Store;
use blade_core::transport::{Code, Response};
use std::path::Path;
use std::sync::Arc;

pub mod create;
pub mod destroy;
pub mod status;
pub mod targets;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub fn dispatch(cli: Cli, cfg: &BladeConfig) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Create(args) => create::run(args, &open_runner(cfg)?),
        Command::Destroy(args) => destroy::run(args, &open_runner(cfg)?),
        Command::Status(args) => status::run(args, &open_runner(cfg)?),
        Command::Targets => targets::run(),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

/// Opens the ledger and makes sure its schema exists. Errors here are fatal.
fn open_runner(cfg: &BladeConfig) -> anyhow::Result<Runner> {
    ensure_parent_dir(&cfg.db_path)?;
    let store = Store::open(&cfg.db_path)?;
    store.init_schema()?;
    Ok(Runner::new(
        store,
        default_registry(),
        Arc::new(LocalChannel::new(&cfg.script_path)),
    ))
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Prints the response on stdout and maps it to an exit code. Storage errors
/// are reported as `DatabaseError` responses.
pub(crate) fn emit(result: anyhow::Result<Response>) -> i32 {
    let resp = result.unwrap_or_else(|e| {
        tracing::error!(event = "storage.error", error = %format!("{:#}", e));
        Response::fail(Code::DatabaseError, format!("{:#}", e))
    });
    println!("{}", resp.to_json());
    if resp.success {
        exit_codes::OK
    } else {
        exit_codes::FAILED
    }
}
