/// Build completion sources: where the host build pipeline's "build done"
/// signal comes from.
///
/// - `stdin`: the bundler pipes its output to us and writes one JSON object
///   `{"startTime": ..., "endTime": ...}` per completed build. Other lines are
///   relayed to stderr, minus known watch-mode chatter.
/// - `poll`: the emitted artifacts are polled; once their newest mtime has
///   changed and then stayed put for the settle window, the build is done.
///
/// Both deliver events over a channel so the runner handles them one at a
/// time.
use crate::config::{OzeaConfig, SourceKind};
use crate::elapsed::BuildCompletionEvent;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Watch-mode chatter that only clutters the console.
static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Webpack is watching the files…|Project is running at|webpack output is served from|404s will fallback to",
    )
    .unwrap()
});

/// Start the configured source. The task ends when the source is exhausted
/// or the receiver is dropped.
pub fn spawn(
    config: &OzeaConfig,
    tx: mpsc::Sender<BuildCompletionEvent>,
) -> Result<JoinHandle<Result<(), SourceError>>, SourceError> {
    match config.watch.source {
        SourceKind::Stdin => {
            let verbose = config.build.verbose;
            tracing::info!("reading build events from stdin");
            Ok(tokio::spawn(read_events(tokio::io::stdin(), verbose, tx)))
        }
        SourceKind::Poll => {
            let poller = ArtifactPoller::new(
                &config.watch_pattern(),
                Duration::from_millis(config.watch.check_interval_ms),
                Duration::from_millis(config.watch.settle_ms),
            )?;
            tracing::info!(pattern = %poller.pattern(), "polling build artifacts");
            Ok(tokio::spawn(poller.run(tx)))
        }
    }
}

// --- stdin ---

/// How a line of bundler output is handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Event(BuildCompletionEvent),
    Relay,
    Suppressed,
}

pub fn classify(line: &str, verbose: bool) -> Line {
    if let Some(event) = parse_event(line) {
        return Line::Event(event);
    }
    if !verbose && NOISE.is_match(line) {
        return Line::Suppressed;
    }
    Line::Relay
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "startTime")]
    start_time: Option<f64>,
    #[serde(rename = "endTime")]
    end_time: Option<f64>,
}

/// Parse a completion event. Objects carrying neither timestamp are not
/// events; a missing or null timestamp becomes NaN.
pub fn parse_event(line: &str) -> Option<BuildCompletionEvent> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let raw: RawEvent = serde_json::from_str(trimmed).ok()?;
    if raw.start_time.is_none() && raw.end_time.is_none() {
        return None;
    }
    Some(BuildCompletionEvent::new(
        raw.start_time.unwrap_or(f64::NAN),
        raw.end_time.unwrap_or(f64::NAN),
    ))
}

/// Read bundler output line by line until EOF.
pub async fn read_events<R>(
    reader: R,
    verbose: bool,
    tx: mpsc::Sender<BuildCompletionEvent>,
) -> Result<(), SourceError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|e| SourceError::Read { source: e })?;
        if read == 0 {
            break;
        }
        // bundler output may carry paths in any encoding
        let decoded = String::from_utf8_lossy(&buf);
        let line = decoded.trim_end_matches(['\n', '\r']);
        match classify(line, verbose) {
            Line::Event(event) => {
                tracing::debug!(?event, "build completion event");
                if tx.send(event).await.is_err() {
                    return Ok(());
                }
            }
            Line::Relay => eprintln!("{line}"),
            Line::Suppressed => {}
        }
    }
    tracing::info!("build event stream closed");
    Ok(())
}

// --- poll ---

#[derive(Debug, Clone, Copy)]
struct PendingBuild {
    started: SystemTime,
    changed_at: SystemTime,
}

/// Detects finished builds from artifact modification times.
///
/// Artifacts already present at startup count as a finished build, so the
/// last build's server comes up without waiting for the next rebuild.
#[derive(Debug)]
pub struct ArtifactPoller {
    pattern: String,
    check_interval: Duration,
    settle: Duration,
    last_seen: Option<SystemTime>,
    pending: Option<PendingBuild>,
}

impl ArtifactPoller {
    pub fn new(pattern: &str, check_interval: Duration, settle: Duration) -> Result<Self, SourceError> {
        glob::Pattern::new(pattern).map_err(|e| SourceError::Pattern {
            pattern: pattern.to_string(),
            source: e,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            check_interval,
            settle,
            last_seen: None,
            pending: None,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Feed one observation of the newest artifact mtime taken at `now`.
    pub fn observe(&mut self, newest: Option<SystemTime>, now: SystemTime) -> Option<BuildCompletionEvent> {
        if newest != self.last_seen {
            self.last_seen = newest;
            self.pending = match newest {
                Some(_) => Some(PendingBuild {
                    started: self.pending.map_or(now, |p| p.started),
                    changed_at: now,
                }),
                // artifacts removed: the bundler is cleaning, wait for output
                None => None,
            };
            return None;
        }

        let pending = self.pending?;
        let quiet_for = now.duration_since(pending.changed_at).unwrap_or_default();
        if quiet_for < self.settle {
            return None;
        }
        self.pending = None;
        Some(BuildCompletionEvent::new(
            epoch_millis(pending.started),
            epoch_millis(now),
        ))
    }

    /// Poll until the receiver goes away.
    pub async fn run(mut self, tx: mpsc::Sender<BuildCompletionEvent>) -> Result<(), SourceError> {
        let mut ticker = tokio::time::interval(self.check_interval);
        loop {
            ticker.tick().await;
            let newest = newest_mtime(&self.pattern)?;
            if let Some(event) = self.observe(newest, SystemTime::now()) {
                tracing::debug!(?event, "artifacts settled");
                if tx.send(event).await.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

/// Newest modification time among files matching `pattern`.
pub fn newest_mtime(pattern: &str) -> Result<Option<SystemTime>, SourceError> {
    let paths = glob::glob(pattern).map_err(|e| SourceError::Pattern {
        pattern: pattern.to_string(),
        source: e,
    })?;

    let mut newest: Option<SystemTime> = None;
    for entry in paths {
        let path: PathBuf = match entry {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable artifact path");
                continue;
            }
        };
        let Ok(modified) = std::fs::metadata(&path).and_then(|m| m.modified()) else {
            continue;
        };
        if newest.is_none_or(|n| modified > n) {
            newest = Some(modified);
        }
    }
    Ok(newest)
}

fn epoch_millis(t: SystemTime) -> f64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as f64
}

/// Errors from build event sources.
#[derive(Debug)]
pub enum SourceError {
    Read {
        source: std::io::Error,
    },
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Read { source } => write!(f, "failed to read build events: {}", source),
            SourceError::Pattern { pattern, source } => {
                write!(f, "invalid artifact pattern {:?}: {}", pattern, source)
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Read { source } => Some(source),
            SourceError::Pattern { source, .. } => Some(source),
        }
    }
}
