use blade_core::engine::Runner;

use super::emit;
use crate::cli::args::DestroyArgs;

pub fn run(args: DestroyArgs, runner: &Runner) -> anyhow::Result<i32> {
    Ok(emit(runner.destroy(&args.uid, args.action.as_deref())))
}
