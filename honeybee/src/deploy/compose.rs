//! Compose command invocation

#[cfg(unix)]
use std::os::fd::{FromRawFd, OwnedFd};
use std::path::Path;
use std::process::Stdio;

#[cfg(unix)]
use tokio::net::unix::pipe;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::errors::HoneybeeError;
use crate::filesys::dir::Dir;

/// Read end of a child's merged stdout and stderr
#[cfg(unix)]
pub type CombinedOutput = pipe::Receiver;

/// Without a shared pipe both streams are read separately
#[cfg(not(unix))]
pub struct CombinedOutput {
    pub stdout: Option<tokio::process::ChildStdout>,
    pub stderr: Option<tokio::process::ChildStderr>,
}

/// Orchestrator invocation, e.g. `docker compose`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeCommand {
    program: String,
    args: Vec<String>,
}

impl ComposeCommand {
    pub fn new(parts: &[String]) -> Result<Self, HoneybeeError> {
        let (program, args) = parts.split_first().ok_or_else(|| {
            HoneybeeError::ConfigError("The compose command must not be empty".to_string())
        })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn command(&self, subcommand: &str, working_dir: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(subcommand)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }

    /// Spawn `<program> <args..> <subcommand>` in `working_dir`.
    ///
    /// Stdout and stderr share one pipe so their lines keep the order the
    /// child wrote them in. SIGINT is restored to its default action in the
    /// child, so an interrupt reaches it even when HoneyBee itself was
    /// started with SIGINT ignored.
    #[cfg(unix)]
    pub fn spawn(
        &self,
        subcommand: &str,
        working_dir: &Path,
    ) -> std::io::Result<(Child, CombinedOutput)> {
        let (reader, writer) = output_pipe()?;
        let mut command = self.command(subcommand, working_dir);
        command
            .stdout(Stdio::from(writer.try_clone()?))
            .stderr(Stdio::from(writer));
        // SAFETY: only the async-signal-safe `signal` runs between fork and exec
        unsafe {
            command.pre_exec(|| {
                if libc::signal(libc::SIGINT, libc::SIG_DFL) == libc::SIG_ERR {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        let child = command.spawn()?;
        // The command holds our copies of the write end until dropped
        drop(command);

        Ok((child, pipe::Receiver::from_owned_fd(reader)?))
    }

    #[cfg(not(unix))]
    pub fn spawn(
        &self,
        subcommand: &str,
        working_dir: &Path,
    ) -> std::io::Result<(Child, CombinedOutput)> {
        let mut command = self.command(subcommand, working_dir);
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = command.spawn()?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        Ok((child, CombinedOutput { stdout, stderr }))
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for ComposeCommand {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            args: vec!["compose".to_string()],
        }
    }
}

/// Anonymous pipe whose ends are closed on exec, so only the child we hand
/// the write end to keeps it open
#[cfg(unix)]
fn output_pipe() -> std::io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as libc::c_int; 2];

    #[cfg(any(target_os = "linux", target_os = "android"))]
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: both descriptors were just created and are owned by nobody else
    let (reader, writer) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    for fd in [fds[0], fds[1]] {
        if unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    Ok((reader, writer))
}

/// `<compose> ls` exits 0 and prints its `NAME` table header
pub async fn check_compose_installed(compose: &ComposeCommand) -> bool {
    let output = Command::new(&compose.program)
        .args(&compose.args)
        .arg("ls")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await;

    match output {
        Ok(output) => {
            let supported = output.status.success() && output.stdout.starts_with(b"NAME");
            debug!("`{} ls` -> {} (supported: {})", compose.display(), output.status, supported);
            supported
        }
        Err(e) => {
            debug!("Unable to run `{} ls`: {}", compose.display(), e);
            false
        }
    }
}

/// Delete `<prefix>-*` directories under `temp_root` left by sessions that
/// never cleaned up
pub async fn reap_stray_sessions(temp_root: &Path, prefix: &str) -> Result<usize, HoneybeeError> {
    let root = Dir::new(temp_root);
    if !root.exists().await {
        return Ok(0);
    }

    let marker = format!("{}-", prefix);
    let mut reaped = 0;
    for path in root.list_dirs().await? {
        let is_session = path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with(&marker))
            .unwrap_or(false);
        if !is_session {
            continue;
        }
        match Dir::new(&path).delete().await {
            Ok(()) => {
                info!("Removed stray deploy directory {}", path.display());
                reaped += 1;
            }
            Err(e) => warn!("Unable to remove stray deploy directory {}: {}", path.display(), e),
        }
    }
    Ok(reaped)
}
