use blade_core::engine::{CreateRequest, Runner};
use blade_core::exec::flags::parse_flag_args;

use super::emit;
use crate::cli::args::CreateArgs;

pub fn run(args: CreateArgs, runner: &Runner) -> anyhow::Result<i32> {
    let mut flags = match parse_flag_args(&args.flags) {
        Ok(f) => f,
        Err(resp) => return Ok(emit(Ok(resp))),
    };

    // `--uid` and `--process` may also follow `<action>`; the earlier spelling wins.
    let trailing_uid = flags.remove("uid");
    let trailing_process = flags.remove("process");
    let process = if args.process.is_empty() {
        trailing_process.unwrap_or_default()
    } else {
        args.process
    };

    let req = CreateRequest {
        target: args.target,
        action: args.action,
        flags,
        uid: args.uid.or(trailing_uid),
        process,
    };
    Ok(emit(runner.create(&req)))
}
