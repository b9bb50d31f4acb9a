//! Privileged device-access preparation for the external source
//!
//! A UVC device node is normally not readable by the application. Before
//! each external start attempt a short privileged command sequence relaxes
//! the node permissions: capability probe, best-effort enforcement toggle,
//! then the chmod itself. Everything here runs on the capture worker; the
//! commands block until the subprocess exits and no explicit timeout is
//! enforced.

use std::fmt;
use std::process::Command;

/// Executor for elevated shell commands.
///
/// Returns the exit code and combined stdout/stderr. Spawn failures are
/// reported as exit code -1 with the error text as output.
pub trait PrivilegedShell: Send + Sync {
    fn run(&self, cmd: &str) -> (i32, String);
}

/// Runs commands through `su -c`, the rooted-device elevation path.
pub struct SuShell;

impl PrivilegedShell for SuShell {
    fn run(&self, cmd: &str) -> (i32, String) {
        match Command::new("su").arg("-c").arg(cmd).output() {
            Ok(output) => {
                let code = output.status.code().unwrap_or(-1);
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                (code, combined.trim().to_string())
            }
            Err(e) => (-1, format!("su failed: {}", e)),
        }
    }
}

/// Structured failure reasons from the preparation sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The identity probe failed; elevation is unavailable
    ProbeFailed { code: i32, output: String },
    /// The device-node chmod failed
    PermissionFixFailed { code: i32, output: String },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AccessError::ProbeFailed { code, output } => {
                write!(f, "elevation unavailable (id exited {}): {}", code, output)
            }
            AccessError::PermissionFixFailed { code, output } => {
                write!(f, "chmod failed ({}): {}", code, output)
            }
        }
    }
}

impl std::error::Error for AccessError {}

/// Prepare the external video device nodes for opening.
///
/// Sequence: `id` probe (fatal on non-zero exit), `setenforce 0` (best
/// effort, failure ignored), `chmod 666 <device_glob>` (fatal on non-zero
/// exit). On success returns a short probe summary for telemetry.
pub fn prepare_device_access(
    shell: &dyn PrivilegedShell,
    device_glob: &str,
) -> Result<String, AccessError> {
    let (id_code, id_out) = shell.run("id");
    let probe = format!("su(id)={} {}", id_code, truncate(&id_out, 80));
    log::debug!("device access probe: {}", probe);
    if id_code != 0 {
        return Err(AccessError::ProbeFailed {
            code: id_code,
            output: id_out,
        });
    }

    // Best effort; a locked-down policy still leaves chmod worth trying.
    let (se_code, _) = shell.run("setenforce 0");
    if se_code != 0 {
        log::debug!("setenforce 0 exited {}, continuing", se_code);
    }

    let chmod = format!("chmod 666 {} 2>/dev/null", device_glob);
    let (ch_code, ch_out) = shell.run(&chmod);
    if ch_code != 0 {
        return Err(AccessError::PermissionFixFailed {
            code: ch_code,
            output: ch_out,
        });
    }

    Ok(probe)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
