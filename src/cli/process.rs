use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Process, Signal, System};
use tracing::info;

use super::daemon_path::to_daemon_path;

/// Executables that may be running a tracker: this cli and the daemon next to it.
fn tracker_executables() -> Result<Vec<PathBuf>> {
    let current = env::current_exe()?;
    let daemon = to_daemon_path(&current);
    Ok(vec![current, daemon])
}

/// What a tracker process was started to do, recovered from its command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCommand {
    /// `watch`, attached to a terminal.
    Foreground { dir: Option<PathBuf> },
    /// `serve` or the daemon. `None` means the default application directory.
    Background { dir: Option<PathBuf> },
}

impl TrackerCommand {
    pub fn from_command_line(command_line: &[OsString]) -> Self {
        let mut dir = None;
        let mut subcommand = None;
        let mut args = command_line.iter().skip(1);
        while let Some(arg) = args.next() {
            let Some(value) = arg.to_str() else {
                continue;
            };
            if value == "--dir" {
                dir = args.next().map(PathBuf::from);
            } else if let Some(path) = value.strip_prefix("--dir=") {
                dir = Some(PathBuf::from(path));
            } else if subcommand.is_none() && !value.starts_with('-') {
                subcommand = Some(value);
            }
        }

        match subcommand {
            Some("watch") => Self::Foreground { dir },
            _ => Self::Background { dir },
        }
    }
}

/// Every other process started from one of `names`, with what it is running.
fn running_trackers<'a>(
    system: &'a System,
    names: &[PathBuf],
) -> Result<Vec<(&'a Process, TrackerCommand)>> {
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get own pid: {e}"))?;
    Ok(system
        .processes()
        .iter()
        .filter(|(pid, _)| **pid != current_id)
        .filter(|(_, process)| !matches!(process.parent(), Some(p) if p == current_id))
        .filter(|(_, process)| {
            process
                .exe()
                .filter(|v| v.exists())
                .filter(|v| names.iter().any(|name| name == v))
                .is_some()
        })
        .map(|(_, process)| (process, TrackerCommand::from_command_line(process.cmd())))
        .collect())
}

fn terminate(process: &Process) {
    info!("Stopping tracker {}", process.pid());
    // This will forcefully terminate the process on Windows. Anything better will require a
    // lot more work.
    if process.kill_with(Signal::Term).is_none() {
        process.kill();
    }
    process.wait();
}

/// Terminates every other process started from one of `names`. Trackers flush on termination
/// where the platform allows it. Returns how many processes were stopped.
pub fn kill_previous_servers(names: &[PathBuf]) -> Result<usize> {
    let system = System::new_all();
    let trackers = running_trackers(&system, names)?;
    for (process, _) in &trackers {
        terminate(process);
    }
    Ok(trackers.len())
}

pub fn stop_trackers() -> Result<usize> {
    kill_previous_servers(&tracker_executables()?)
}

fn spawn_server(dir: Option<&Path>) -> Result<()> {
    let process_name = env::current_exe()?;
    let mut command = std::process::Command::new(process_name);
    command.arg("serve");
    if let Some(dir) = dir {
        command.arg("--dir").arg(std::path::absolute(dir)?);
    }

    #[cfg(feature = "win")]
    {
        use std::os::windows::process::CommandExt;
        use windows::Win32::System::Threading::DETACHED_PROCESS;
        command.creation_flags(DETACHED_PROCESS.0);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    #[allow(clippy::zombie_processes)]
    let child = command.spawn()?;
    info!("Spawned tracker {}", child.id());
    Ok(())
}

/// Intended for shutting down previous server and starting new one. Currently for simplicity sake
/// it operates using a detached process. This is not great but it's not as hard to configure.
pub fn restart_server(dir: Option<&Path>) -> Result<()> {
    stop_trackers()?;
    spawn_server(dir)
}

/// Keeps background trackers from writing while another command changes the stored documents.
/// Each stopped tracker is started again on [TrackerPause::resume], into the directory it was
/// using.
pub struct TrackerPause {
    stopped_dirs: Vec<Option<PathBuf>>,
}

impl TrackerPause {
    /// Fails without stopping anything when a `watch` is running, as it can't be restarted in
    /// its terminal.
    pub fn pause() -> Result<Self> {
        let system = System::new_all();
        let trackers = running_trackers(&system, &tracker_executables()?)?;
        if let Some((process, _)) = trackers
            .iter()
            .find(|(_, command)| matches!(command, TrackerCommand::Foreground { .. }))
        {
            return Err(anyhow!(
                "`timekeeper watch` is running as process {}, stop it first",
                process.pid()
            ));
        }

        let mut stopped_dirs = Vec::new();
        for (process, command) in trackers {
            terminate(process);
            if let TrackerCommand::Background { dir } = command {
                if !stopped_dirs.contains(&dir) {
                    stopped_dirs.push(dir);
                }
            }
        }
        if !stopped_dirs.is_empty() {
            info!("Paused trackers for {stopped_dirs:?}");
        }
        Ok(Self { stopped_dirs })
    }

    pub fn was_running(&self) -> bool {
        !self.stopped_dirs.is_empty()
    }

    pub fn resume(self) -> Result<()> {
        for dir in &self.stopped_dirs {
            spawn_server(dir.as_deref())?;
        }
        Ok(())
    }
}
