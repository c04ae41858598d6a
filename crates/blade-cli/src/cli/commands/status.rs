use blade_core::engine::{Runner, StatusQuery};

use super::emit;
use crate::cli::args::StatusArgs;

pub fn run(args: StatusArgs, runner: &Runner) -> anyhow::Result<i32> {
    let query = match (args.uid, args.program_type) {
        (Some(uid), _) => StatusQuery::Uid(uid),
        (None, Some(program_type)) => StatusQuery::Running {
            program_type,
            process: args.process,
        },
        (None, None) => StatusQuery::All,
    };
    Ok(emit(runner.status(&query)))
}
