use std::sync::Arc;

use super::os::cpu::CpuCommandModelSpec;
use super::{ExpActionCommandSpec, ExpModelCommandSpec};

/// Fault catalog keyed by fault name; actions resolve by name or alias.
#[derive(Clone, Default)]
pub struct FaultRegistry {
    specs: Vec<Arc<dyn ExpModelCommandSpec>>,
}

pub fn default_registry() -> FaultRegistry {
    FaultRegistry::new(vec![Arc::new(CpuCommandModelSpec)])
}

impl FaultRegistry {
    pub fn new(specs: Vec<Arc<dyn ExpModelCommandSpec>>) -> Self {
        Self { specs }
    }

    pub fn register(&mut self, spec: Arc<dyn ExpModelCommandSpec>) {
        self.specs.retain(|s| s.name() != spec.name());
        self.specs.push(spec);
    }

    pub fn specs(&self) -> &[Arc<dyn ExpModelCommandSpec>] {
        &self.specs
    }

    pub fn find(&self, target: &str) -> Option<Arc<dyn ExpModelCommandSpec>> {
        self.specs.iter().find(|s| s.name() == target).cloned()
    }

    pub fn find_action(
        &self,
        target: &str,
        action: &str,
    ) -> Option<(Arc<dyn ExpModelCommandSpec>, Arc<dyn ExpActionCommandSpec>)> {
        let spec = self.find(target)?;
        let action = spec.actions().into_iter().find(|a| a.matches(action))?;
        Some((spec, action))
    }
}
