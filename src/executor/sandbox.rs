// Child process setup: environment, working directory and kernel limits

use crate::executor::config::ExecutorConfig;
use crate::executor::types::ResourcePolicy;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::warn;

/// PATH given to restricted children
pub const RESTRICTED_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Environment variable prefixes never passed to a child
const DENIED_ENV_PREFIXES: &[&str] = &["LD_", "DYLD_"];

/// Interpreter startup hooks never passed to a child
const DENIED_ENV_NAMES: &[&str] = &[
    "BASH_ENV",
    "ENV",
    "SHELLOPTS",
    "BASHOPTS",
    "IFS",
    "PS4",
    "RUBYOPT",
    "RUBYLIB",
    "PERL5OPT",
    "PERL5LIB",
    "PERLLIB",
    "PYTHONSTARTUP",
    "PYTHONPATH",
    "PYTHONHOME",
    "NODE_OPTIONS",
    "GCONV_PATH",
];

/// Variables fixed by restricted mode; callers cannot replace them
const RESTRICTED_BASELINE: &[&str] = &["PATH", "HOME", "TMPDIR", "LANG"];

#[cfg(all(target_os = "linux", target_env = "gnu"))]
type RlimitResource = libc::__rlimit_resource_t;
#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
type RlimitResource = libc::c_int;

/// Limits applied inside the child between fork and exec
#[derive(Debug, Clone, Copy)]
pub struct SpawnLimits {
    pub niceness: i32,
    pub memory_bytes: u64,
    pub restricted: bool,
    pub max_open_files: u64,
    pub isolate_network: bool,
}

impl SpawnLimits {
    pub fn new(policy: &ResourcePolicy, config: &ExecutorConfig) -> Self {
        Self {
            niceness: policy.niceness,
            memory_bytes: policy.memory_limit_mb.saturating_mul(1024 * 1024),
            restricted: policy.restricted,
            max_open_files: config.max_open_files,
            isolate_network: policy.restricted && config.isolate_network,
        }
    }
}

/// Build the command: argument vector, piped output, own process group
pub fn build_command(
    program: &str,
    args: &[String],
    policy: &ResourcePolicy,
    working_dir: &Path,
    limits: SpawnLimits,
) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .process_group(0);

    if policy.restricted {
        cmd.env_clear()
            .env("PATH", RESTRICTED_PATH)
            .env("HOME", working_dir)
            .env("TMPDIR", working_dir)
            .env("LANG", "C.UTF-8");
    }
    for (key, value) in allowed_env(&policy.environment, policy.restricted) {
        cmd.env(key, value);
    }

    // SAFETY: apply_limits only makes async-signal-safe libc calls and
    // touches no memory shared with the parent
    unsafe {
        cmd.pre_exec(move || apply_limits(&limits));
    }

    cmd
}

/// Caller variables minus loader and interpreter hooks and malformed names
///
/// In restricted mode the baseline variables are never replaced.
pub fn allowed_env(
    environment: &BTreeMap<String, String>,
    restricted: bool,
) -> impl Iterator<Item = (&String, &String)> {
    environment.iter().filter(move |(key, value)| {
        let allowed = env_name_allowed(key, restricted) && !value.contains('\0');
        if !allowed {
            warn!(name = %key, restricted = restricted, "caller environment variable dropped");
        }
        allowed
    })
}

fn env_name_allowed(key: &str, restricted: bool) -> bool {
    if key.is_empty() || key.contains('=') || key.contains('\0') {
        return false;
    }
    if DENIED_ENV_PREFIXES.iter().any(|p| key.starts_with(p)) {
        return false;
    }
    if DENIED_ENV_NAMES.iter().any(|name| key.eq_ignore_ascii_case(name)) {
        return false;
    }
    !(restricted && RESTRICTED_BASELINE.iter().any(|name| key.eq_ignore_ascii_case(name)))
}

/// Runs in the forked child before exec
fn apply_limits(limits: &SpawnLimits) -> io::Result<()> {
    unsafe {
        // Lowering priority always succeeds; raising it may be refused, in
        // which case the inherited priority stands
        let _ = libc::setpriority(libc::PRIO_PROCESS, 0, limits.niceness);

        #[cfg(any(target_os = "linux", target_os = "android"))]
        if limits.memory_bytes > 0 {
            set_limit(libc::RLIMIT_AS, limits.memory_bytes as libc::rlim_t)?;
        }
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        {
            let _ = limits.memory_bytes;
        }

        if limits.restricted {
            set_limit(libc::RLIMIT_CORE, 0)?;
            set_limit(libc::RLIMIT_NOFILE, limits.max_open_files as libc::rlim_t)?;
            libc::umask(0o077);

            #[cfg(target_os = "linux")]
            if libc::prctl(
                libc::PR_SET_NO_NEW_PRIVS,
                1 as libc::c_ulong,
                0 as libc::c_ulong,
                0 as libc::c_ulong,
                0 as libc::c_ulong,
            ) != 0 {
                return Err(io::Error::last_os_error());
            }

            #[cfg(target_os = "linux")]
            if limits.isolate_network && libc::unshare(libc::CLONE_NEWUSER | libc::CLONE_NEWNET) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

/// Set soft and hard limit, never above the current hard limit
unsafe fn set_limit(resource: RlimitResource, value: libc::rlim_t) -> io::Result<()> {
    let mut current = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    unsafe {
        if libc::getrlimit(resource, &mut current) != 0 {
            return Err(io::Error::last_os_error());
        }
        let value = if current.rlim_max == libc::RLIM_INFINITY {
            value
        } else {
            value.min(current.rlim_max)
        };
        let limit = libc::rlimit {
            rlim_cur: value,
            rlim_max: value,
        };
        if libc::setrlimit(resource, &limit) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
