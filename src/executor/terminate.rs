// Process group termination
//
// Children are spawned as leaders of their own process group, so the group
// id equals the child's pid and signalling -pid reaches every descendant
// that did not leave the group.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Send `signal` to process group `pgid`; a group that is already gone is not an error
pub fn signal_group(pgid: u32, signal: libc::c_int) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    if pgid <= 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid process group"));
    }

    // SAFETY: kill(2) has no memory-safety preconditions
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}

/// SIGTERM the group, wait up to `grace`, then SIGKILL and reap
///
/// Shared by timeout and cancellation.
pub async fn terminate_group(child: &mut Child, pgid: u32, grace: Duration) -> io::Result<ExitStatus> {
    if let Err(e) = signal_group(pgid, libc::SIGTERM) {
        warn!(pgid = pgid, error = %e, "SIGTERM to process group failed");
    }

    match timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            debug!(pgid = pgid, "process exited after SIGTERM");
            // Stragglers in the group may have ignored SIGTERM
            let _ = signal_group(pgid, libc::SIGKILL);
            return Ok(status);
        }
        Ok(Err(e)) => warn!(pgid = pgid, error = %e, "wait failed after SIGTERM"),
        Err(_) => debug!(
            pgid = pgid,
            grace_ms = grace.as_millis() as u64,
            "process ignored SIGTERM, sending SIGKILL"
        ),
    }

    if let Err(e) = signal_group(pgid, libc::SIGKILL) {
        warn!(pgid = pgid, error = %e, "SIGKILL to process group failed");
    }
    child.wait().await
}

/// Whether a process with this pid is still alive
///
/// Zombies count as dead: they hold no resources and in containers without
/// an init they may never be reaped.
pub fn process_alive(pid: u32) -> bool {
    let Ok(raw) = libc::pid_t::try_from(pid) else {
        return false;
    };

    #[cfg(target_os = "linux")]
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        // State follows the parenthesised command name, which may contain spaces
        return match stat.rfind(')').and_then(|i| stat[i + 1..].split_whitespace().next()) {
            Some(state) => state != "Z" && state != "X",
            None => true,
        };
    }

    // SAFETY: signal 0 only performs the existence and permission check
    let rc = unsafe { libc::kill(raw, 0) };
    rc == 0 || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}
