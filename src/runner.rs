/// The session loop: take the lock, announce the dev server, then feed build
/// completion events to the supervisor one at a time until the source closes
/// or a shutdown signal arrives.
use crate::config::{OzeaConfig, Target};
use crate::data_dir::{DataDir, LockError};
use crate::elapsed::BuildCompletionEvent;
use crate::launcher::{LaunchError, LaunchSpec, Launcher, NodeLauncher};
use crate::reporter::Reporter;
use crate::signals::{ShutdownSignal, SignalHandler};
use crate::source::{self, SourceError};
use crate::status::{StatusTracker, SupervisorState};
use crate::supervisor::Supervisor;
use std::future::Future;
use tokio::sync::mpsc;

const EVENT_BUFFER: usize = 16;

/// What a session reacts to builds with.
pub enum Handler<L: Launcher> {
    /// Restart the server bundle on every build.
    Server(Supervisor<L>),
    /// Only report client builds.
    Client(Reporter),
}

impl<L: Launcher> Handler<L> {
    pub fn new(target: Target, launcher: L, spec: LaunchSpec, reporter: Reporter) -> Self {
        match target {
            Target::Server => Handler::Server(Supervisor::new(launcher, spec, reporter)),
            Target::Client => Handler::Client(reporter),
        }
    }

    fn on_build_complete(
        &mut self,
        event: &BuildCompletionEvent,
        status: &mut StatusTracker,
    ) -> Result<(), LaunchError> {
        match self {
            Handler::Server(supervisor) => {
                if supervisor.is_tracking() {
                    status.update(SupervisorState::Restarting);
                }
                let launch = match supervisor.on_build_complete(event) {
                    Ok(launch) => launch,
                    Err(e) => {
                        status.clear_child();
                        return Err(e);
                    }
                };
                tracing::debug!(kind = ?launch.kind, pid = ?launch.pid, "server launched");
                status.record_launch(&launch, supervisor.launches(), supervisor.restarts());
                status.update(SupervisorState::Running);
            }
            Handler::Client(reporter) => {
                let elapsed = event.elapsed();
                reporter.client_ready(elapsed);
                status.record_build(elapsed.to_string());
                status.update(SupervisorState::Waiting);
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Handler::Server(supervisor) = self {
            supervisor.shutdown();
        }
    }
}

/// Why the event loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    SourceClosed,
    Signalled(ShutdownSignal),
}

/// Process events until the channel closes or `shutdown` resolves. The
/// tracked server is stopped on every exit path.
pub async fn drive<L, F>(
    handler: &mut Handler<L>,
    events: &mut mpsc::Receiver<BuildCompletionEvent>,
    status: &mut StatusTracker,
    shutdown: F,
) -> Result<Outcome, LaunchError>
where
    L: Launcher,
    F: Future<Output = ShutdownSignal>,
{
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            biased;
            signal = &mut shutdown => break Ok(Outcome::Signalled(signal)),
            event = events.recv() => match event {
                Some(event) => {
                    if let Err(e) = handler.on_build_complete(&event, status) {
                        tracing::error!(error = %e, "server launch failed");
                        break Err(e);
                    }
                }
                None => break Ok(Outcome::SourceClosed),
            },
        }
    };

    status.update(SupervisorState::ShuttingDown);
    handler.shutdown();
    status.clear_child();
    result
}

/// Run a full session for the configured target.
pub async fn run(config: &OzeaConfig, color: bool) -> Result<Outcome, RunError> {
    let data_dir = DataDir::new(&config.storage.data_dir);
    data_dir
        .ensure_initialized()
        .map_err(|e| RunError::DataDir { source: e })?;
    let _lock = data_dir.acquire_lock()?;

    let target = config.build.target;
    let mut status = StatusTracker::new(data_dir.status(), target);
    status.update(SupervisorState::Starting);

    let mut reporter = Reporter::stdout(color);
    reporter.banner(target, &config.urls);
    let spec = LaunchSpec::from_config(&config.server);
    tracing::info!(?target, entry = %spec.entry.display(), "session starting");
    let mut handler = Handler::new(target, NodeLauncher, spec, reporter);

    let (tx, mut events) = mpsc::channel(EVENT_BUFFER);
    let source_task = source::spawn(config, tx)?;

    #[cfg(feature = "serve")]
    let serve_task = config.serve.enabled.then(|| {
        let serve_config = config.serve.clone();
        let status_path = data_dir.status();
        tokio::spawn(async move {
            if let Err(e) = crate::serve::run(&serve_config, status_path).await {
                tracing::warn!("status endpoint stopped: {e}");
            }
        })
    });
    #[cfg(not(feature = "serve"))]
    if config.serve.enabled {
        tracing::warn!("status endpoint requested but ozea was built without the serve feature");
    }

    let mut signals = SignalHandler::install().map_err(|e| RunError::Signals { source: e })?;
    status.update(SupervisorState::Waiting);

    let result = drive(&mut handler, &mut events, &mut status, signals.recv()).await;

    #[cfg(feature = "serve")]
    if let Some(task) = serve_task {
        task.abort();
    }
    status.remove();

    let outcome = result?;
    match outcome {
        Outcome::SourceClosed => {
            // the source ended on its own; surface why if it failed
            match source_task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e.into()),
                Err(e) => tracing::warn!(error = %e, "event source task failed"),
            }
        }
        Outcome::Signalled(signal) => {
            tracing::info!(?signal, "shutdown requested");
            source_task.abort();
        }
    }
    Ok(outcome)
}

/// Errors that end a session.
#[derive(Debug)]
pub enum RunError {
    DataDir { source: std::io::Error },
    Lock(LockError),
    Source(SourceError),
    Launch(LaunchError),
    Signals { source: std::io::Error },
}

impl From<LockError> for RunError {
    fn from(e: LockError) -> Self {
        RunError::Lock(e)
    }
}

impl From<SourceError> for RunError {
    fn from(e: SourceError) -> Self {
        RunError::Source(e)
    }
}

impl From<LaunchError> for RunError {
    fn from(e: LaunchError) -> Self {
        RunError::Launch(e)
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::DataDir { source } => write!(f, "failed to prepare data directory: {}", source),
            RunError::Lock(e) => write!(f, "{}", e),
            RunError::Source(e) => write!(f, "{}", e),
            RunError::Launch(e) => write!(f, "{}", e),
            RunError::Signals { source } => {
                write!(f, "failed to install signal handlers: {}", source)
            }
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::DataDir { source } => Some(source),
            RunError::Lock(e) => std::error::Error::source(e),
            RunError::Source(e) => std::error::Error::source(e),
            RunError::Launch(e) => std::error::Error::source(e),
            RunError::Signals { source } => Some(source),
        }
    }
}
