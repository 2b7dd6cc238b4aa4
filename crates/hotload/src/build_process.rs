//! Watch-mode build command running alongside the server.

use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};

/// Child process running the configured build command.
///
/// The child inherits stdout and stderr. On unix it leads its own process
/// group, and stopping or dropping it kills the whole group so bundlers
/// forked by the shell go down with it.
pub(crate) struct BuildProcess {
    child: Child,
    command: String,
    /// Process group to signal, cleared once signalled.
    group: Option<u32>,
}

impl BuildProcess {
    /// Spawn `command` through the platform shell in `cwd`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell cannot be started.
    pub(crate) fn spawn(command: &str, cwd: &Path) -> io::Result<Self> {
        let child = shell_command(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let group = child.id();
        tracing::info!(command, pid = group, "Started build command");

        Ok(Self {
            child,
            command: command.to_owned(),
            group,
        })
    }

    /// Kill the build command and everything it spawned.
    pub(crate) async fn stop(mut self) {
        let exited = self.child.try_wait();
        if let Some(group) = self.group.take() {
            kill_group(group);
        }
        match exited {
            Ok(Some(status)) => {
                tracing::info!(command = %self.command, %status, "Build command already exited");
            }
            Ok(None) | Err(_) => {
                if let Err(e) = self.child.kill().await {
                    tracing::warn!(
                        command = %self.command,
                        error = %e,
                        "Failed to stop build command"
                    );
                } else {
                    tracing::info!(command = %self.command, "Stopped build command");
                }
            }
        }
    }
}

impl Drop for BuildProcess {
    fn drop(&mut self) {
        if let Some(group) = self.group.take() {
            kill_group(group);
        }
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).process_group(0);
    cmd
}

/// Send `SIGKILL` to every process in the group led by `pid`.
#[cfg(unix)]
fn kill_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg takes no pointers; the group was created for this child
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        let error = io::Error::last_os_error();
        if error.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pgid, %error, "Failed to kill build process group");
        }
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(windows)]
fn kill_group(_pid: u32) {}
