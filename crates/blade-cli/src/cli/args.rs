use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "blade",
    version,
    about = "Inject, inspect and tear down host faults"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// YAML config file (db_path, script_path, log_level)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Preparation ledger database (overrides config and BLADE_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Directory holding the fault binaries (overrides config and BLADE_SCRIPT_PATH)
    #[arg(long, global = true)]
    pub script_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start a fault, e.g. `blade create cpu fullload --cpu-count 2`
    Create(CreateArgs),
    /// Stop a running fault by uid
    Destroy(DestroyArgs),
    /// Show ledger records
    Status(StatusArgs),
    /// List fault targets, actions and flags
    Targets,
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CreateArgs {
    /// Use this uid instead of generating one
    #[arg(long)]
    pub uid: Option<String>,

    /// Process the fault is scoped to (empty: whole host)
    #[arg(long, default_value = "")]
    pub process: String,

    /// Fault target, e.g. `cpu`
    pub target: String,

    /// Action name or alias, e.g. `fullload` / `fl`
    pub action: String,

    /// Fault flags: `--name value` or `--name=value`. `--uid` and `--process`
    /// are also accepted here.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub flags: Vec<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DestroyArgs {
    pub uid: String,

    /// Action to stop; only needed when the target has several actions
    #[arg(long)]
    pub action: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long)]
    pub uid: Option<String>,

    /// Show the running record of this target
    #[arg(long = "type")]
    pub program_type: Option<String>,

    /// Narrow `--type` to one process (empty: any)
    #[arg(long, default_value = "")]
    pub process: String,
}
