//! Bounded subprocess execution.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use cuprobe_core::{Version, VersionError, VersionProbe, VersionQuery};
use tracing::{debug, trace, warn};
use wait_timeout::ChildExt;

/// Run `program` with `args`, stdin closed, and return stdout followed by
/// stderr. The exit status is ignored: plenty of tools print their version
/// and then exit non-zero. A child still running after `timeout` is killed.
pub fn run_captured(
    program: &Path,
    args: &[&str],
    timeout: Duration,
) -> Result<String, VersionError> {
    let spawn_error = |e: std::io::Error| VersionError::Spawn {
        path: program.to_path_buf(),
        reason: e.to_string(),
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_error)?;

    // Drain both pipes while waiting so a chatty child cannot block on a full pipe.
    let stdout = child.stdout.take().map(|pipe| thread::spawn(move || drain(pipe)));
    let stderr = child.stderr.take().map(|pipe| thread::spawn(move || drain(pipe)));

    match child.wait_timeout(timeout).map_err(spawn_error)? {
        Some(status) => trace!(program = %program.display(), %status, "probe finished"),
        None => {
            debug!(program = %program.display(), "probe timed out, killing it");
            if let Err(e) = child.kill() {
                warn!(program = %program.display(), error = %e, "failed to kill timed out probe");
            }
            if let Err(e) = child.wait() {
                warn!(program = %program.display(), error = %e, "failed to reap timed out probe");
            }
            // Both pipes close once the child is gone.
            join(stdout);
            join(stderr);
            return Err(VersionError::Timeout {
                path: program.to_path_buf(),
                seconds: timeout.as_secs(),
            });
        }
    }

    let mut output = join(stdout);
    output.push_str(&join(stderr));
    Ok(output)
}

fn drain(mut pipe: impl Read) -> String {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

fn join(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// [`VersionProbe`] that runs the binary.
#[derive(Debug, Clone, Copy)]
pub struct CommandVersionProbe {
    timeout: Duration,
}

impl CommandVersionProbe {
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl VersionProbe for CommandVersionProbe {
    fn query(&self, binary: &Path, query: &VersionQuery) -> Result<Version, VersionError> {
        if !binary.is_file() {
            return Err(VersionError::Missing(binary.to_path_buf()));
        }

        let args: Vec<&str> = query.flag().into_iter().collect();
        let output = run_captured(binary, &args, self.timeout)?;

        query.extract(&output).ok_or_else(|| VersionError::Parse {
            path: binary.to_path_buf(),
            output: output.trim().to_string(),
        })
    }
}
