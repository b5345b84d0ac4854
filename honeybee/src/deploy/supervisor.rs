//! Local deploy supervisor
//!
//! Owns at most one `compose up` session. Output of the session is published
//! line by line to shared state and to broadcast subscribers; a stop request
//! interrupts the child, drains what is left, runs `compose down` and removes
//! the session's working directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::deploy::compose::{
    check_compose_installed, reap_stray_sessions, CombinedOutput, ComposeCommand,
};
use crate::deploy::fsm::{DeployFsm, DeployState, DeployTransition};
use crate::deploy::output::{collect_lines, pump_output};
use crate::errors::HoneybeeError;
use crate::filesys::dir::Dir;
use crate::storage::settings::DeploySettings;

/// Name prefix of session working directories
pub const SESSION_PREFIX: &str = "honeybee";

const EVENT_CAPACITY: usize = 1024;

/// How long to keep reading after `up` had to be killed
const KILL_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Supervisor options
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub compose: ComposeCommand,
    pub compose_file_name: String,
    /// Parent of the per-session working directories
    pub temp_root: PathBuf,
    /// Wait for the child to exit after an interrupt before killing it
    pub stop_timeout: Duration,
    /// Run `down` and remove the working directory after a crash
    pub teardown_on_exit: bool,
}

impl SupervisorOptions {
    pub fn from_settings(settings: &DeploySettings) -> Result<Self, HoneybeeError> {
        Ok(Self {
            compose: ComposeCommand::new(&settings.compose_command)?,
            compose_file_name: settings.compose_file_name.clone(),
            temp_root: std::env::temp_dir(),
            stop_timeout: Duration::from_secs(settings.stop_timeout_secs),
            teardown_on_exit: settings.teardown_on_exit,
        })
    }
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            compose: ComposeCommand::default(),
            compose_file_name: "docker-compose.yaml".to_string(),
            temp_root: std::env::temp_dir(),
            stop_timeout: Duration::from_secs(60),
            teardown_on_exit: true,
        }
    }
}

/// Notification sent to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEvent {
    /// One output line was appended
    Line(String),
    /// The session changed state
    State(DeployState),
    /// The published output was cleared
    Cleared,
}

/// Snapshot of the supervisor
#[derive(Debug, Clone)]
pub struct DeployStatus {
    pub state: DeployState,
    pub working_dir: Option<PathBuf>,
    pub output: Vec<String>,
    pub last_exit_code: Option<i32>,
    /// Why the last launch failed
    pub error: Option<String>,
}

/// How a session ended
#[derive(Debug)]
enum SessionOutcome {
    Stopped(Vec<String>),
    Exited(Option<i32>),
}

struct ActiveSession {
    working_dir: Dir,
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<SessionOutcome>,
}

/// State shared between the supervisor and its session task
struct Shared {
    fsm: Mutex<DeployFsm>,
    output: RwLock<Vec<String>>,
    working_dir: RwLock<Option<PathBuf>>,
    last_transcript: RwLock<Vec<String>>,
    events: broadcast::Sender<DeployEvent>,
}

impl Shared {
    async fn transition(&self, event: DeployTransition) -> Result<DeployState, String> {
        let state = self.fsm.lock().await.process(event)?;
        debug!("Deploy state: {}", state);
        let _ = self.events.send(DeployEvent::State(state));
        Ok(state)
    }

    /// Transition that cannot fail unless the session bookkeeping is broken
    async fn advance(&self, event: DeployTransition) {
        if let Err(e) = self.transition(event).await {
            error!("Deploy state machine: {}", e);
        }
    }

    async fn push_line(&self, line: String) {
        self.output.write().await.push(line.clone());
        let _ = self.events.send(DeployEvent::Line(line));
    }

    /// Publish the finished session's transcript and clear the live output
    async fn finish(&self, transcript: Vec<String>) {
        *self.last_transcript.write().await = transcript;
        self.output.write().await.clear();
        *self.working_dir.write().await = None;
        let _ = self.events.send(DeployEvent::Cleared);
    }
}

/// Session-scoped owner of the local deploy
pub struct DeploySupervisor {
    options: SupervisorOptions,
    shared: Arc<Shared>,
    session: Mutex<Option<ActiveSession>>,
}

impl DeploySupervisor {
    pub fn new(options: SupervisorOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            options,
            shared: Arc::new(Shared {
                fsm: Mutex::new(DeployFsm::new()),
                output: RwLock::new(Vec::new()),
                working_dir: RwLock::new(None),
                last_transcript: RwLock::new(Vec::new()),
                events,
            }),
            session: Mutex::new(None),
        }
    }

    /// Whether the compose command is usable on this host
    pub async fn is_supported(&self) -> bool {
        check_compose_installed(&self.options.compose).await
    }

    /// Remove working directories left behind by earlier runs
    pub async fn reap_stray_sessions(&self) -> Result<usize, HoneybeeError> {
        reap_stray_sessions(&self.options.temp_root, SESSION_PREFIX).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeployEvent> {
        self.shared.events.subscribe()
    }

    pub async fn state(&self) -> DeployState {
        self.shared.fsm.lock().await.state()
    }

    /// Output published so far by the current session
    pub async fn output(&self) -> Vec<String> {
        self.shared.output.read().await.clone()
    }

    /// Full output (`up` then `down`) of the last finished session
    pub async fn last_transcript(&self) -> Vec<String> {
        self.shared.last_transcript.read().await.clone()
    }

    pub async fn status(&self) -> DeployStatus {
        let (state, last_exit_code, error) = {
            let fsm = self.shared.fsm.lock().await;
            (fsm.state(), fsm.last_exit_code(), fsm.error().map(str::to_string))
        };
        DeployStatus {
            state,
            working_dir: self.shared.working_dir.read().await.clone(),
            output: self.output().await,
            last_exit_code,
            error,
        }
    }

    /// Write `compose_yaml` into a fresh working directory and launch `up`.
    ///
    /// Fails with [`HoneybeeError::DeployActive`] while another session runs.
    pub async fn start(&self, compose_yaml: &str) -> Result<PathBuf, HoneybeeError> {
        let mut session = self.session.lock().await;

        if let Some(active) = session.as_ref() {
            if !active.handle.is_finished() {
                return Err(HoneybeeError::DeployActive(
                    active.working_dir.path().display().to_string(),
                ));
            }
        }
        if let Some(finished) = session.take() {
            if let Err(e) = finished.handle.await {
                warn!("Previous deploy session task failed: {}", e);
            }
        }

        if let Err(e) = self.shared.transition(DeployTransition::Launch).await {
            debug!("Refusing deploy: {}", e);
            return Err(HoneybeeError::DeployActive(
                self.options.temp_root.display().to_string(),
            ));
        }

        let (working_dir, child, output) = match self.launch(compose_yaml).await {
            Ok(launched) => launched,
            Err(e) => {
                self.shared
                    .advance(DeployTransition::LaunchFailed(e.to_string()))
                    .await;
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        pump_output(output, tx);

        self.shared.output.write().await.clear();
        *self.shared.working_dir.write().await = Some(working_dir.path().to_path_buf());
        self.shared.advance(DeployTransition::Launched).await;
        info!(
            "Local deploy running in {}",
            working_dir.path().display()
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_session(
            self.shared.clone(),
            self.options.clone(),
            working_dir.clone(),
            child,
            rx,
            stop_rx,
        ));

        let path = working_dir.path().to_path_buf();
        *session = Some(ActiveSession {
            working_dir,
            stop_tx,
            handle,
        });
        Ok(path)
    }

    async fn launch(
        &self,
        compose_yaml: &str,
    ) -> Result<(Dir, Child, CombinedOutput), HoneybeeError> {
        let working_dir = Dir::create_temp_dir(&self.options.temp_root, SESSION_PREFIX).await?;
        let launched = async {
            working_dir
                .file(&self.options.compose_file_name)
                .write_string(compose_yaml)
                .await?;
            self.options
                .compose
                .spawn("up", working_dir.path())
                .map_err(|e| {
                    HoneybeeError::Subprocess(format!(
                        "Failed to launch `{} up`: {}",
                        self.options.compose.display(),
                        e
                    ))
                })
        }
        .await;

        match launched {
            Ok((child, output)) => Ok((working_dir, child, output)),
            Err(e) => {
                if let Err(cleanup) = working_dir.delete().await {
                    warn!(
                        "Unable to remove {}: {}",
                        working_dir.path().display(),
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    /// Stop the running session and return its full transcript
    pub async fn stop(&self) -> Result<Vec<String>, HoneybeeError> {
        let mut session = self.session.lock().await;
        let active = session.take().ok_or(HoneybeeError::NoActiveDeploy)?;

        info!(
            "Stopping local deploy in {}",
            active.working_dir.path().display()
        );
        // The session may already be tearing down after a crash
        let _ = active.stop_tx.send(());

        match active.handle.await {
            Ok(SessionOutcome::Stopped(transcript)) => Ok(transcript),
            Ok(SessionOutcome::Exited(code)) => {
                debug!("Session had already exited with {:?}", code);
                Err(HoneybeeError::NoActiveDeploy)
            }
            Err(e) => Err(HoneybeeError::Internal(format!(
                "Deploy session task failed: {}",
                e
            ))),
        }
    }

    /// Stop the session if there is one
    pub async fn shutdown(&self) -> Result<(), HoneybeeError> {
        match self.stop().await {
            Ok(_) | Err(HoneybeeError::NoActiveDeploy) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

async fn run_session(
    shared: Arc<Shared>,
    options: SupervisorOptions,
    working_dir: Dir,
    mut child: Child,
    mut rx: mpsc::UnboundedReceiver<String>,
    mut stop_rx: oneshot::Receiver<()>,
) -> SessionOutcome {
    loop {
        tokio::select! {
            line = rx.recv() => match line {
                Some(line) => shared.push_line(line).await,
                None => break,
            },
            _ = &mut stop_rx => {
                let transcript = stop_session(&shared, &options, &working_dir, child, rx).await;
                return SessionOutcome::Stopped(transcript);
            }
        }
    }

    // Output closed without a stop request: the child is gone or going
    let code = match child.wait().await {
        Ok(status) => status.code(),
        Err(e) => {
            error!("Unable to wait for `up`: {}", e);
            None
        }
    };
    warn!("Local deploy exited on its own with code {:?}", code);
    shared.advance(DeployTransition::Exited(code)).await;

    let mut transcript = shared.output.read().await.clone();
    if options.teardown_on_exit {
        transcript.extend(run_to_completion(&options, "down", working_dir.path()).await);
        remove_working_dir(&working_dir).await;
    }

    shared.finish(transcript).await;
    shared.advance(DeployTransition::Reset).await;
    SessionOutcome::Exited(code)
}

async fn stop_session(
    shared: &Shared,
    options: &SupervisorOptions,
    working_dir: &Dir,
    mut child: Child,
    mut rx: mpsc::UnboundedReceiver<String>,
) -> Vec<String> {
    shared.advance(DeployTransition::Stop).await;
    interrupt(&mut child);

    let drained = tokio::time::timeout(options.stop_timeout, async {
        while let Some(line) = rx.recv().await {
            shared.push_line(line).await;
        }
    })
    .await;
    if drained.is_err() {
        warn!(
            "`up` did not exit within {:?} of the interrupt, killing it",
            options.stop_timeout
        );
        if let Err(e) = child.kill().await {
            warn!("Unable to kill `up`: {}", e);
        }
        // Leftover children of `up` may still hold the pipe open
        let rest = tokio::time::timeout(KILL_DRAIN_TIMEOUT, async {
            while let Some(line) = rx.recv().await {
                shared.push_line(line).await;
            }
        })
        .await;
        if rest.is_err() {
            warn!(
                "Output of `up` still open {:?} after kill, giving up on it",
                KILL_DRAIN_TIMEOUT
            );
        }
    }
    match child.wait().await {
        Ok(status) => debug!("`up` exited with {}", status),
        Err(e) => warn!("Unable to wait for `up`: {}", e),
    }

    for line in run_to_completion(options, "down", working_dir.path()).await {
        shared.push_line(line).await;
    }

    let transcript = shared.output.read().await.clone();
    remove_working_dir(working_dir).await;
    shared.finish(transcript.clone()).await;
    shared.advance(DeployTransition::Stopped).await;
    info!("Local deploy stopped");
    transcript
}

#[cfg(unix)]
fn interrupt(child: &mut Child) {
    match child.id() {
        Some(pid) => unsafe {
            libc::kill(pid as i32, libc::SIGINT);
        },
        None => debug!("`up` already exited, no interrupt sent"),
    }
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!("Unable to stop `up`: {}", e);
    }
}

/// Run `<compose> <subcommand>` in `working_dir` and collect its output
async fn run_to_completion(
    options: &SupervisorOptions,
    subcommand: &str,
    working_dir: &Path,
) -> Vec<String> {
    let (mut child, output) = match options.compose.spawn(subcommand, working_dir) {
        Ok(spawned) => spawned,
        Err(e) => {
            error!(
                "Failed to launch `{} {}`: {}",
                options.compose.display(),
                subcommand,
                e
            );
            return Vec::new();
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    pump_output(output, tx);
    let lines = collect_lines(rx).await;

    match child.wait().await {
        Ok(status) if !status.success() => warn!(
            "`{} {}` exited with {}",
            options.compose.display(),
            subcommand,
            status
        ),
        Ok(_) => {}
        Err(e) => warn!("Unable to wait for `{}`: {}", subcommand, e),
    }
    lines
}

async fn remove_working_dir(working_dir: &Dir) {
    match working_dir.delete().await {
        Ok(()) => debug!("Removed {}", working_dir.path().display()),
        Err(e) => error!(
            "Unable to remove deploy directory {}: {}",
            working_dir.path().display(),
            e
        ),
    }
}
