/// Rebuild-triggered lifecycle of the dev server process.
///
/// The supervisor owns at most one tracked process. Each completed build
/// replaces it: the old process is signalled first, then the fresh build is
/// spawned without waiting for the old one to exit. Nothing is retried and
/// nothing is de-duplicated; two events always mean two spawns.
use crate::elapsed::{BuildCompletionEvent, Elapsed};
use crate::launcher::{LaunchError, LaunchSpec, Launcher, ServerProcess};
use crate::reporter::Reporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchKind {
    Start,
    Restart,
}

/// What a completed build led to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Launch {
    pub kind: LaunchKind,
    pub pid: Option<u32>,
    pub elapsed: Elapsed,
}

pub struct Supervisor<L: Launcher> {
    launcher: L,
    spec: LaunchSpec,
    reporter: Reporter,
    tracked: Option<L::Process>,
    launches: u64,
    restarts: u64,
}

impl<L: Launcher> Supervisor<L> {
    pub fn new(launcher: L, spec: LaunchSpec, reporter: Reporter) -> Self {
        Self {
            launcher,
            spec,
            reporter,
            tracked: None,
            launches: 0,
            restarts: 0,
        }
    }

    /// Handle one successful rebuild.
    ///
    /// On a spawn failure the error is returned as is and nothing is tracked
    /// afterwards; any previous process has already been signalled.
    pub fn on_build_complete(&mut self, event: &BuildCompletionEvent) -> Result<Launch, LaunchError> {
        let elapsed = event.elapsed();

        let kind = match self.tracked.take() {
            Some(mut previous) => {
                self.reporter.restarting(elapsed);
                tracing::info!(pid = ?previous.pid(), %elapsed, "restarting server");
                previous.terminate();
                LaunchKind::Restart
            }
            None => {
                self.reporter.starting(elapsed);
                tracing::info!(%elapsed, "starting server");
                LaunchKind::Start
            }
        };

        let process = self.launcher.launch(&self.spec)?;
        let pid = process.pid();
        self.tracked = Some(process);
        self.launches += 1;
        if kind == LaunchKind::Restart {
            self.restarts += 1;
        }

        Ok(Launch { kind, pid, elapsed })
    }

    /// Signal the tracked process, if any, and stop tracking it.
    ///
    /// Returns the pid that was signalled.
    pub fn shutdown(&mut self) -> Option<u32> {
        let mut process = self.tracked.take()?;
        let pid = process.pid();
        tracing::info!(pid = ?pid, "stopping server");
        process.terminate();
        pid
    }

    pub fn is_tracking(&self) -> bool {
        self.tracked.is_some()
    }

    #[allow(dead_code)]
    pub fn tracked_pid(&self) -> Option<u32> {
        self.tracked.as_ref().and_then(|p| p.pid())
    }

    /// Successful spawns so far.
    pub fn launches(&self) -> u64 {
        self.launches
    }

    pub fn restarts(&self) -> u64 {
        self.restarts
    }
}
