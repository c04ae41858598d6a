//! Experiment command model.
//!
//! A fault category implements [`ExpModelCommandSpec`]; each of its actions
//! implements [`ExpActionCommandSpec`] and hands out an [`Executor`] bound to a
//! [`Channel`]. The runner resolves both by name and never sees concrete types.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::ExpModel;
use crate::transport::Response;

pub mod channel;
pub mod flags;
pub mod os;
pub mod registry;

pub use channel::{Channel, LocalChannel};
pub use registry::{default_registry, FaultRegistry};

pub const START_FLAG: &str = "start";
pub const STOP_FLAG: &str = "stop";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpFlag {
    pub name: &'static str,
    pub desc: &'static str,
    pub required: bool,
}

impl ExpFlag {
    pub const fn optional(name: &'static str, desc: &'static str) -> Self {
        Self {
            name,
            desc,
            required: false,
        }
    }

    pub const fn required(name: &'static str, desc: &'static str) -> Self {
        Self {
            name,
            desc,
            required: true,
        }
    }
}

/// Deferred setup produced by a [`PreExecutor`]. May return a channel that
/// replaces the default one for this invocation.
pub type PreExecFn = Box<dyn FnOnce() -> anyhow::Result<Option<Arc<dyn Channel>>> + Send>;

pub trait PreExecutor: Send + Sync {
    fn pre_exec(
        &self,
        cmd_name: &str,
        parent_cmd_name: &str,
        flags: &BTreeMap<String, String>,
    ) -> Option<PreExecFn>;
}

/// One fault category, e.g. `cpu`.
pub trait ExpModelCommandSpec: Send + Sync {
    fn name(&self) -> &'static str;
    fn short_desc(&self) -> &'static str;
    fn long_desc(&self) -> &'static str;
    fn example(&self) -> &'static str;
    fn actions(&self) -> Vec<Arc<dyn ExpActionCommandSpec>>;
    fn flags(&self) -> Vec<ExpFlag>;
    fn pre_executor(&self) -> Box<dyn PreExecutor>;
}

/// One action of a fault category, e.g. `cpu fullload`.
pub trait ExpActionCommandSpec: Send + Sync {
    fn name(&self) -> &'static str;
    fn aliases(&self) -> &'static [&'static str];
    fn short_desc(&self) -> &'static str;
    fn long_desc(&self) -> &'static str;
    /// Flags that select the target of the fault rather than tune it.
    fn matchers(&self) -> Vec<ExpFlag>;
    fn flags(&self) -> Vec<ExpFlag>;
    fn executor(&self, channel: Option<Arc<dyn Channel>>) -> Box<dyn Executor>;

    fn matches(&self, name: &str) -> bool {
        self.name() == name || self.aliases().contains(&name)
    }
}

/// Turns a validated invocation into at most one host command per call.
pub trait Executor: Send + Sync {
    fn name(&self) -> &'static str;
    fn set_channel(&mut self, channel: Arc<dyn Channel>);
    fn start(&self, uid: &str, model: &ExpModel) -> Response;
    fn stop(&self, uid: &str, model: &ExpModel) -> Response;
}
