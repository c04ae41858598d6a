use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resolved invocation: which fault, which action, and the flags it runs with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpModel {
    pub target: String,
    pub action_name: String,
    #[serde(default)]
    pub action_flags: BTreeMap<String, String>,
}

impl ExpModel {
    pub fn new(target: &str, action_name: &str) -> Self {
        Self {
            target: target.to_string(),
            action_name: action_name.to_string(),
            action_flags: BTreeMap::new(),
        }
    }

    pub fn with_flag(mut self, name: &str, value: &str) -> Self {
        self.action_flags.insert(name.to_string(), value.to_string());
        self
    }

    /// Flag value, or `""` when the flag was not supplied.
    pub fn flag(&self, name: &str) -> &str {
        self.action_flags
            .get(name)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// One row of the preparation ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationRecord {
    pub uid: String,
    pub program_type: String,
    /// Empty means the fault is not scoped to a process.
    pub process: String,
    pub port: String,
    pub status: String,
    pub error: String,
    pub create_time: String,
    pub update_time: String,
}

impl PreparationRecord {
    /// A fresh `Running` record stamped with the current time.
    pub fn running(uid: &str, program_type: &str, process: &str) -> Self {
        let now = now_rfc3339();
        Self {
            uid: uid.to_string(),
            program_type: program_type.to_string(),
            process: process.to_string(),
            port: String::new(),
            status: PreparationStatus::Running.as_str().to_string(),
            error: String::new(),
            create_time: now.clone(),
            update_time: now,
        }
    }

    pub fn status(&self) -> Option<PreparationStatus> {
        PreparationStatus::parse(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreparationStatus {
    Running,
    Error,
    Destroyed,
}

impl PreparationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PreparationStatus::Running => "Running",
            PreparationStatus::Error => "Error",
            PreparationStatus::Destroyed => "Destroyed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Running" => Some(PreparationStatus::Running),
            "Error" => Some(PreparationStatus::Error),
            "Destroyed" => Some(PreparationStatus::Destroyed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, PreparationStatus::Running)
    }
}

/// RFC 3339 UTC with nanoseconds; sorts lexically.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_roundtrip() {
        for s in [
            PreparationStatus::Running,
            PreparationStatus::Error,
            PreparationStatus::Destroyed,
        ] {
            assert_eq!(PreparationStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(PreparationStatus::parse("running"), None);
        assert!(!PreparationStatus::Running.is_terminal());
        assert!(PreparationStatus::Destroyed.is_terminal());
    }

    #[test]
    fn test_running_record_has_matching_timestamps() {
        let r = PreparationRecord::running("u1", "cpu", "");
        assert_eq!(r.status(), Some(PreparationStatus::Running));
        assert_eq!(r.create_time, r.update_time);
        assert!(r.create_time.ends_with('Z'));
    }

    #[test]
    fn test_missing_flag_reads_as_empty() {
        let m = ExpModel::new("cpu", "fullload").with_flag("cpu-count", "2");
        assert_eq!(m.flag("cpu-count"), "2");
        assert_eq!(m.flag("cpu-list"), "");
    }
}
