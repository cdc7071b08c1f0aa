/// Launching the built server entry and signalling it to stop.
///
/// `Launcher` is the seam between the supervisor and the OS: the supervisor
/// only ever sees `ServerProcess` handles, so tests can count spawn and kill
/// calls without forking anything.
use crate::config::ServerConfig;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Everything needed to start one server instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    pub entry: PathBuf,
}

impl LaunchSpec {
    /// Resolve the launch command for the emitted server entry.
    ///
    /// The entry path is made absolute against our own working directory, so
    /// a relative `cwd` for the child does not change which file runs.
    pub fn from_config(server: &ServerConfig) -> Self {
        let entry = absolute(&server.dist_dir.join(&server.entry));

        let mut args = Vec::new();
        if server.inspect {
            args.push("--inspect".to_string());
        }
        args.extend(server.exec_args.iter().cloned());
        args.push(entry.to_string_lossy().into_owned());

        Self {
            program: server.runtime.clone(),
            args,
            cwd: server.cwd.clone(),
            env: server.env.clone(),
            entry,
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// A running server instance owned by the supervisor.
pub trait ServerProcess {
    fn pid(&self) -> Option<u32>;

    /// Ask the process to stop. Does not wait for it to exit, and treats an
    /// already-exited process as stopped.
    fn terminate(&mut self);
}

pub trait Launcher {
    type Process: ServerProcess;

    fn launch(&mut self, spec: &LaunchSpec) -> Result<Self::Process, LaunchError>;
}

/// Launches real child processes that inherit our stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeLauncher;

impl Launcher for NodeLauncher {
    type Process = ChildProcess;

    fn launch(&mut self, spec: &LaunchSpec) -> Result<ChildProcess, LaunchError> {
        tracing::debug!(
            program = %spec.program,
            args = ?spec.args,
            cwd = %spec.cwd.display(),
            "spawning server"
        );

        // stdin stays ours: the stdin event source reads from it.
        let child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| LaunchError::Spawn {
                program: spec.program.clone(),
                source: e,
            })?;

        let pid = child.id();
        tracing::info!(pid = ?pid, entry = %spec.entry.display(), "server process started");
        Ok(ChildProcess { child, pid })
    }
}

/// Handle to a spawned child. Dropping it neither kills nor waits; tokio
/// reaps the orphan in the background.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    pid: Option<u32>,
}

impl ServerProcess for ChildProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn terminate(&mut self) {
        if let Ok(Some(status)) = self.child.try_wait() {
            tracing::debug!(pid = ?self.pid, %status, "server already exited");
            return;
        }
        let Some(pid) = self.pid else {
            return;
        };
        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) => tracing::debug!(pid, "sent SIGTERM to server"),
            Err(e) => tracing::debug!(pid, error = %e, "SIGTERM not delivered"),
        }
    }
}

/// Errors from launching the server.
#[derive(Debug)]
pub enum LaunchError {
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchError::Spawn { program, source } => {
                write!(f, "failed to spawn server with {}: {}", program, source)
            }
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaunchError::Spawn { source, .. } => Some(source),
        }
    }
}
