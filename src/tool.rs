//! Bounded execution of external tools (git, the 1C platform).

use crate::error::ToolError;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
pub const ACCOUNTING_TIMEOUT: Duration = Duration::from_secs(30);
pub const REMOTE_PRUNE_TIMEOUT: Duration = Duration::from_secs(300);
pub const GC_TIMEOUT: Duration = Duration::from_secs(900);
pub const REPAIR_TIMEOUT: Duration = Duration::from_secs(1800);

/// Captured output of a finished process.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`ToolError::Failed`] carrying stderr.
    pub fn check(self) -> Result<ToolOutput, ToolError> {
        if self.success() {
            return Ok(self);
        }
        let stderr = self.stderr.trim_end_matches(['\r', '\n']).to_string();
        Err(ToolError::Failed {
            code: self.code.unwrap_or(-1),
            stderr: if stderr.is_empty() {
                "Unknown error".to_string()
            } else {
                stderr
            },
        })
    }
}

/// Run `program args..` in `cwd`, killing it once `timeout` elapses.
pub fn run(
    program: &Path,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    let name = program.display().to_string();
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    // Own process group, so a timeout can take down everything the tool spawned.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    tracing::debug!(program = %name, ?args, ?cwd, timeout_secs = timeout.as_secs(), "spawning tool");
    let mut child = command.spawn().map_err(|source| ToolError::Spawn {
        program: name.clone(),
        source,
    })?;

    // Drain both pipes while waiting so a chatty tool cannot block on a full pipe.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            tracing::warn!(program = %name, timeout_secs = timeout.as_secs(), "tool timed out, killing it");
            kill_tree(&mut child);
            return Err(ToolError::Timeout {
                program: name,
                timeout,
            });
        }
        Err(source) => {
            kill_tree(&mut child);
            return Err(ToolError::Wait {
                program: name,
                source,
            });
        }
    };

    let output = ToolOutput {
        code: status.code(),
        stdout: stdout.map(join).unwrap_or_default(),
        stderr: stderr.map(join).unwrap_or_default(),
    };
    tracing::debug!(program = %name, code = ?output.code, "tool finished");
    Ok(output)
}

/// Kill the child together with its descendants, then reap it.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    match libc::pid_t::try_from(child.id()) {
        // The child leads its own group (see `process_group(0)` above).
        Ok(pgid) => {
            let ret = unsafe { libc::killpg(pgid, libc::SIGKILL) };
            if ret != 0 {
                tracing::debug!(pgid, error = %std::io::Error::last_os_error(), "killpg failed");
                let _ = child.kill();
            }
        }
        Err(_) => {
            let _ = child.kill();
        }
    }
    let _ = child.wait();
}

#[cfg(windows)]
fn kill_tree(child: &mut Child) {
    let pid = child.id().to_string();
    let killed = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if !killed {
        let _ = child.kill();
    }
    let _ = child.wait();
}

#[cfg(not(any(unix, windows)))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}
