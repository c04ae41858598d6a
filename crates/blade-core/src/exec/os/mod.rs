//! Host operating-system faults.

pub mod cpu;

/// CPU affinity tool required for core-list selection.
pub const TASKSET_COMMAND: &str = "taskset";
