use std::collections::BTreeMap;
use std::sync::Arc;

use super::TASKSET_COMMAND;
use crate::exec::{
    Channel, ExpActionCommandSpec, ExpFlag, ExpModelCommandSpec, Executor, PreExecFn, PreExecutor,
    START_FLAG, STOP_FLAG,
};
use crate::model::ExpModel;
use crate::transport::{Code, Response};

pub const CPU_COUNT_FLAG: &str = "cpu-count";
pub const CPU_LIST_FLAG: &str = "cpu-list";

const BURN_CPU_BIN: &str = "chaos_burncpu";

pub struct CpuCommandModelSpec;

impl ExpModelCommandSpec for CpuCommandModelSpec {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn short_desc(&self) -> &'static str {
        "Cpu experiment"
    }

    fn long_desc(&self) -> &'static str {
        "Cpu experiment, for example full load"
    }

    fn example(&self) -> &'static str {
        "cpu fullload"
    }

    fn actions(&self) -> Vec<Arc<dyn ExpActionCommandSpec>> {
        vec![Arc::new(FullLoadActionCommand)]
    }

    fn flags(&self) -> Vec<ExpFlag> {
        vec![
            ExpFlag::optional(CPU_COUNT_FLAG, "Cpu count"),
            ExpFlag::optional(CPU_LIST_FLAG, "CPUs in which to allow burning (0-3 or 1,3)"),
        ]
    }

    fn pre_executor(&self) -> Box<dyn PreExecutor> {
        Box::new(CpuPreExecutor)
    }
}

/// Burning CPU needs no setup.
struct CpuPreExecutor;

impl PreExecutor for CpuPreExecutor {
    fn pre_exec(
        &self,
        _cmd_name: &str,
        _parent_cmd_name: &str,
        _flags: &BTreeMap<String, String>,
    ) -> Option<PreExecFn> {
        None
    }
}

pub struct FullLoadActionCommand;

impl ExpActionCommandSpec for FullLoadActionCommand {
    fn name(&self) -> &'static str {
        "fullload"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["fl"]
    }

    fn short_desc(&self) -> &'static str {
        "cpu fullload"
    }

    fn long_desc(&self) -> &'static str {
        "cpu fullload"
    }

    fn matchers(&self) -> Vec<ExpFlag> {
        Vec::new()
    }

    fn flags(&self) -> Vec<ExpFlag> {
        Vec::new()
    }

    fn executor(&self, channel: Option<Arc<dyn Channel>>) -> Box<dyn Executor> {
        Box::new(CpuExecutor::new(channel))
    }
}

pub struct CpuExecutor {
    channel: Option<Arc<dyn Channel>>,
    host_cpus: usize,
}

impl CpuExecutor {
    pub fn new(channel: Option<Arc<dyn Channel>>) -> Self {
        let host_cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self { channel, host_cpus }
    }

    pub fn with_host_cpus(mut self, host_cpus: usize) -> Self {
        self.host_cpus = host_cpus;
        self
    }

    fn burn(&self, channel: &dyn Channel, args: &str) -> Response {
        channel.run(&channel.script_path().join(BURN_CPU_BIN), args)
    }
}

impl Executor for CpuExecutor {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn set_channel(&mut self, channel: Arc<dyn Channel>) {
        self.channel = Some(channel);
    }

    fn start(&self, _uid: &str, model: &ExpModel) -> Response {
        let Some(channel) = self.channel.as_deref() else {
            return Response::fail(Code::ServerError, "channel is nil");
        };

        let mut cpu_count = 0;
        let mut cpu_list = String::new();

        let cpu_list_flag = model.flag(CPU_LIST_FLAG);
        if !cpu_list_flag.is_empty() {
            if !channel.is_command_available(TASKSET_COMMAND) {
                return Response::fail(
                    Code::EnvironmentError,
                    format!("{} command not exist", TASKSET_COMMAND),
                );
            }
            let cores = match parse_cpu_list(cpu_list_flag) {
                Ok(c) => c,
                Err(e) => {
                    return Response::fail(
                        Code::IllegalParameters,
                        format!("parse {} flag err, {}", CPU_LIST_FLAG, e),
                    )
                }
            };
            cpu_list = cores.join(",");
        } else {
            // cpu-count only applies when no cpu-list was given
            match resolve_cpu_count(model.flag(CPU_COUNT_FLAG), self.host_cpus) {
                Some(n) => cpu_count = n,
                None => {
                    return Response::fail(
                        Code::IllegalParameters,
                        format!("--{} value must be a positive integer", CPU_COUNT_FLAG),
                    )
                }
            }
        }

        let mut args = format!("--{} --{} {}", START_FLAG, CPU_COUNT_FLAG, cpu_count);
        if !cpu_list.is_empty() {
            args = format!("{} --{} {}", args, CPU_LIST_FLAG, cpu_list);
        }
        self.burn(channel, &args)
    }

    fn stop(&self, _uid: &str, _model: &ExpModel) -> Response {
        let Some(channel) = self.channel.as_deref() else {
            return Response::fail(Code::ServerError, "channel is nil");
        };
        self.burn(channel, &format!("--{}", STOP_FLAG))
    }
}

/// Widest range `parse_cpu_list` expands (the kernel's `NR_CPUS` ceiling).
pub const MAX_CPU_RANGE: u64 = 8192;

/// `None` when `raw` is not an integer. Empty means 0; anything `<= 0` or
/// above `host_cpus` burns every core.
pub fn resolve_cpu_count(raw: &str, host_cpus: usize) -> Option<usize> {
    let requested: i64 = if raw.is_empty() { 0 } else { raw.parse().ok()? };
    if requested <= 0 || requested as u64 > host_cpus as u64 {
        Some(host_cpus)
    } else {
        Some(requested as usize)
    }
}

/// Expands `0,2-3` into `["0", "2", "3"]`.
///
/// Blank tokens are skipped and duplicates are kept. A descending range such
/// as `5-2` expands to nothing; a range spanning more than [`MAX_CPU_RANGE`]
/// cores is rejected.
pub fn parse_cpu_list(value: &str) -> anyhow::Result<Vec<String>> {
    let mut cores = Vec::new();
    for part in value.split(',') {
        let token = part.trim();
        if token.is_empty() {
            continue;
        }
        if !token.contains('-') {
            if let Err(e) = token.parse::<u64>() {
                anyhow::bail!("{} value is illegal, {}", token, e);
            }
            cores.push(token.to_string());
            continue;
        }

        let bounds: Vec<&str> = token.split('-').collect();
        let [start, end] = bounds.as_slice() else {
            anyhow::bail!("{} value is illegal", token);
        };
        let Ok(start) = start.trim().parse::<u64>() else {
            anyhow::bail!("start in {} value is illegal", token);
        };
        let Ok(end) = end.trim().parse::<u64>() else {
            anyhow::bail!("end in {} value is illegal", token);
        };
        if end >= start && end - start >= MAX_CPU_RANGE {
            anyhow::bail!(
                "{} value is illegal, range spans more than {} cpus",
                token,
                MAX_CPU_RANGE
            );
        }
        cores.extend((start..=end).map(|i| i.to_string()));
    }
    Ok(cores)
}
