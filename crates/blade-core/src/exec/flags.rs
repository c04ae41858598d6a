use std::collections::BTreeMap;

use super::{ExpActionCommandSpec, ExpFlag, ExpModelCommandSpec};
use crate::transport::{Code, Response};

/// Parses `--name value`, `--name=value` and bare `--name` (read as `"true"`).
pub fn parse_flag_args(args: &[String]) -> Result<BTreeMap<String, String>, Response> {
    let mut flags = BTreeMap::new();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        let Some(stripped) = arg.strip_prefix("--") else {
            return Err(Response::fail(
                Code::IllegalParameters,
                format!("unexpected argument: {}", arg),
            ));
        };
        if stripped.is_empty() {
            return Err(Response::fail(
                Code::IllegalParameters,
                "empty flag name".to_string(),
            ));
        }

        let (name, value) = match stripped.split_once('=') {
            Some((n, v)) => (n.to_string(), v.to_string()),
            None => {
                let value = match iter.peek() {
                    Some(next) if !next.starts_with("--") => iter.next().cloned().unwrap_or_default(),
                    _ => "true".to_string(),
                };
                (stripped.to_string(), value)
            }
        };
        flags.insert(name, value);
    }
    Ok(flags)
}

/// Every flag the fault and action accept, fault-level first.
pub fn accepted_flags(
    spec: &dyn ExpModelCommandSpec,
    action: &dyn ExpActionCommandSpec,
) -> Vec<ExpFlag> {
    let mut all = spec.flags();
    all.extend(action.matchers());
    all.extend(action.flags());
    all
}

pub fn validate_flags(
    spec: &dyn ExpModelCommandSpec,
    action: &dyn ExpActionCommandSpec,
    flags: &BTreeMap<String, String>,
) -> Result<(), Response> {
    let accepted = accepted_flags(spec, action);

    for name in flags.keys() {
        if !accepted.iter().any(|f| f.name == name.as_str()) {
            return Err(Response::fail(
                Code::IllegalParameters,
                format!(
                    "unknown flag --{} for {} {}",
                    name,
                    spec.name(),
                    action.name()
                ),
            ));
        }
    }

    for flag in accepted.iter().filter(|f| f.required) {
        if flags.get(flag.name).map_or(true, |v| v.is_empty()) {
            return Err(Response::fail(
                Code::ParameterLess,
                format!("less --{} flag", flag.name),
            ));
        }
    }
    Ok(())
}
