use std::path::{Path, PathBuf};
use std::process::Command;

use crate::transport::{Code, Response};

/// Where host-level commands are issued.
pub trait Channel: Send + Sync {
    /// Runs `script` with whitespace-separated `args`.
    fn run(&self, script: &Path, args: &str) -> Response;

    /// Directory holding the fault binaries.
    fn script_path(&self) -> &Path;

    fn is_command_available(&self, command: &str) -> bool;
}

/// Runs commands on the local host.
#[derive(Debug, Clone)]
pub struct LocalChannel {
    script_path: PathBuf,
}

impl LocalChannel {
    pub fn new(script_path: impl Into<PathBuf>) -> Self {
        Self {
            script_path: script_path.into(),
        }
    }
}

impl Channel for LocalChannel {
    fn run(&self, script: &Path, args: &str) -> Response {
        tracing::debug!(event = "channel.run", script = %script.display(), args = %args);

        let output = match Command::new(script).args(args.split_whitespace()).output() {
            Ok(o) => o,
            Err(e) => {
                return Response::fail(
                    Code::ExecCommandError,
                    format!("failed to execute {}: {}", script.display(), e),
                )
            }
        };

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            Response::ok(serde_json::Value::String(stdout))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let msg = if stderr.is_empty() {
                format!("{} exited with {}", script.display(), output.status)
            } else {
                stderr
            };
            Response::fail(Code::ExecCommandError, msg)
        }
    }

    fn script_path(&self) -> &Path {
        &self.script_path
    }

    fn is_command_available(&self, command: &str) -> bool {
        Command::new("which")
            .arg(command)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_exec_error() {
        let ch = LocalChannel::new("/nonexistent");
        let resp = ch.run(Path::new("/nonexistent/chaos_burncpu"), "--stop");
        assert!(resp.is_code(Code::ExecCommandError));
        assert!(resp.err_msg().contains("/nonexistent/chaos_burncpu"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_stdout_and_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("ok.sh");
        std::fs::write(&ok, "#!/bin/sh\necho \"args: $*\"\n").unwrap();
        std::fs::set_permissions(&ok, std::fs::Permissions::from_mode(0o755)).unwrap();
        let bad = dir.path().join("bad.sh");
        std::fs::write(&bad, "#!/bin/sh\necho boom >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&bad, std::fs::Permissions::from_mode(0o755)).unwrap();

        let ch = LocalChannel::new(dir.path());
        let resp = ch.run(&ok, "--start  --cpu-count 2");
        assert!(resp.success);
        assert_eq!(resp.result, Some(serde_json::json!("args: --start --cpu-count 2")));

        let resp = ch.run(&bad, "");
        assert!(resp.is_code(Code::ExecCommandError));
        assert_eq!(resp.err_msg(), "boom");
    }
}
