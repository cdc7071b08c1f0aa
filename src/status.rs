/// Status file: rewrites `.ozea/status` as JSON on every supervisor state
/// transition.
///
/// Uses atomic write pattern: write to temp file then rename.
use crate::config::Target;
use crate::supervisor::Launch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Supervisor states written to the status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    Starting,
    Waiting,
    Running,
    Restarting,
    ShuttingDown,
}

/// The JSON payload written to the status file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusData {
    pub pid: u32,
    pub state: SupervisorState,
    pub target: Target,
    pub child_pid: Option<u32>,
    pub launches: u64,
    pub restarts: u64,
    pub last_build: Option<String>,
    pub session_start: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

/// Manages the status file lifecycle.
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Atomically write status data to the status file.
    ///
    /// Writes to a temporary file in the same directory, then renames
    /// to ensure readers never see a partial write.
    pub fn write(&self, data: &StatusData) -> Result<(), StatusError> {
        let json =
            serde_json::to_string_pretty(data).map_err(|e| StatusError::Serialize { source: e })?;

        let dir = self.path.parent().unwrap_or(Path::new("."));
        let tmp_path = dir.join(format!(".ozea.status.tmp.{}", std::process::id()));

        std::fs::write(&tmp_path, json.as_bytes()).map_err(|e| StatusError::Write {
            path: tmp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&tmp_path, &self.path).map_err(|e| StatusError::Rename {
            from: tmp_path,
            to: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }

    /// Read the status file. `Ok(None)` when no session is running.
    pub fn read(&self) -> Result<Option<StatusData>, StatusError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StatusError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StatusError::Parse { source: e })
    }

    /// Remove the status file (on clean shutdown).
    pub fn remove(&self) {
        let _ = std::fs::remove_file(&self.path);
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Mutable state tracker that builds StatusData for each update.
pub struct StatusTracker {
    file: StatusFile,
    pid: u32,
    target: Target,
    child_pid: Option<u32>,
    launches: u64,
    restarts: u64,
    last_build: Option<String>,
    session_start: DateTime<Utc>,
}

impl StatusTracker {
    pub fn new(status_path: PathBuf, target: Target) -> Self {
        Self {
            file: StatusFile::new(status_path),
            pid: std::process::id(),
            target,
            child_pid: None,
            launches: 0,
            restarts: 0,
            last_build: None,
            session_start: Utc::now(),
        }
    }

    /// Update and write the status file with the given state.
    pub fn update(&self, state: SupervisorState) {
        if let Err(e) = self.file.write(&self.snapshot(state)) {
            tracing::warn!(error = %e, "failed to write status file");
        }
    }

    pub fn snapshot(&self, state: SupervisorState) -> StatusData {
        StatusData {
            pid: self.pid,
            state,
            target: self.target,
            child_pid: self.child_pid,
            launches: self.launches,
            restarts: self.restarts,
            last_build: self.last_build.clone(),
            session_start: self.session_start,
            last_update: Utc::now(),
        }
    }

    /// Record a successful launch and the counters it produced.
    pub fn record_launch(&mut self, launch: &Launch, launches: u64, restarts: u64) {
        self.child_pid = launch.pid;
        self.launches = launches;
        self.restarts = restarts;
        self.last_build = Some(launch.elapsed.to_string());
    }

    /// Record a build that did not launch anything (client target).
    pub fn record_build(&mut self, last_build: String) {
        self.last_build = Some(last_build);
    }

    pub fn clear_child(&mut self) {
        self.child_pid = None;
    }

    pub fn remove(&self) {
        self.file.remove();
    }
}

/// Errors from status file operations.
#[derive(Debug)]
pub enum StatusError {
    Serialize {
        source: serde_json::Error,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        source: serde_json::Error,
    },
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusError::Serialize { source } => write!(f, "failed to serialize status: {}", source),
            StatusError::Write { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            StatusError::Rename { from, to, source } => write!(
                f,
                "failed to rename {} to {}: {}",
                from.display(),
                to.display(),
                source
            ),
            StatusError::Read { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            StatusError::Parse { source } => write!(f, "invalid status file: {}", source),
        }
    }
}

impl std::error::Error for StatusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StatusError::Serialize { source } => Some(source),
            StatusError::Write { source, .. } => Some(source),
            StatusError::Rename { source, .. } => Some(source),
            StatusError::Read { source, .. } => Some(source),
            StatusError::Parse { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elapsed::Elapsed;
    use crate::supervisor::LaunchKind;

    #[test]
    fn test_write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = StatusTracker::new(dir.path().join("status"), Target::Server);
        tracker.update(SupervisorState::Waiting);

        let data = StatusFile::new(dir.path().join("status"))
            .read()
            .unwrap()
            .unwrap();
        assert_eq!(data.state, SupervisorState::Waiting);
        assert_eq!(data.target, Target::Server);
        assert_eq!(data.pid, std::process::id());
        assert_eq!(data.child_pid, None);
        assert_eq!(data.launches, 0);
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status");
        let tracker = StatusTracker::new(path.clone(), Target::Client);
        tracker.update(SupervisorState::ShuttingDown);

        let raw = std::fs::read_to_string(path).unwrap();
        assert!(raw.contains("\"shutting_down\""));
        assert!(raw.contains("\"client\""));
    }

    #[test]
    fn test_record_launch() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = StatusTracker::new(dir.path().join("status"), Target::Server);
        let launch = Launch {
            kind: LaunchKind::Restart,
            pid: Some(4242),
            elapsed: Elapsed::from_millis(2000.0),
        };
        tracker.record_launch(&launch, 3, 2);

        let data = tracker.snapshot(SupervisorState::Running);
        assert_eq!(data.child_pid, Some(4242));
        assert_eq!(data.launches, 3);
        assert_eq!(data.restarts, 2);
        assert_eq!(data.last_build.as_deref(), Some("2s"));

        tracker.clear_child();
        assert_eq!(tracker.snapshot(SupervisorState::Waiting).child_pid, None);
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = StatusFile::new(dir.path().join("status"));
        assert!(file.read().unwrap().is_none());
    }

    #[test]
    fn test_read_garbage_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status");
        std::fs::write(&path, "not json").unwrap();
        let err = StatusFile::new(path).read().unwrap_err();
        assert!(matches!(err, StatusError::Parse { .. }));
    }

    #[test]
    fn test_remove_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status");
        let tracker = StatusTracker::new(path.clone(), Target::Server);
        tracker.update(SupervisorState::Starting);
        assert!(path.exists());
        tracker.remove();
        assert!(!path.exists());
        // removing twice is harmless
        tracker.remove();
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let file = StatusFile::new(PathBuf::from("/nonexistent-dir/impossible/status"));
        let data = StatusTracker::new(file.path().to_path_buf(), Target::Server)
            .snapshot(SupervisorState::Starting);
        let err = file.write(&data).unwrap_err();
        assert!(matches!(err, StatusError::Write { .. }));
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = StatusTracker::new(dir.path().join("status"), Target::Server);
        tracker.update(SupervisorState::Running);
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("status")]);
    }
}
