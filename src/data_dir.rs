use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Manages the `.ozea/` directory layout.
///
/// Session artifacts live under a single data directory (default `.ozea/`).
/// This struct provides accessors for each well-known path and handles
/// initialization and the singleton lock.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Create a new DataDir referencing the given root path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory (e.g. `.ozea/`).
    #[allow(dead_code)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the supervisor status file.
    pub fn status(&self) -> PathBuf {
        self.root.join("status")
    }

    /// Path to the singleton lock file.
    pub fn lock(&self) -> PathBuf {
        self.root.join("lock")
    }

    /// Create the data directory if missing.
    /// Returns Ok(true) if it was created, Ok(false) if it already existed.
    pub fn init(&self) -> std::io::Result<bool> {
        let created = !self.root.exists();
        std::fs::create_dir_all(&self.root)?;
        Ok(created)
    }

    /// Ensure the data directory exists and is listed in a neighbouring
    /// .gitignore, if there is one.
    pub fn ensure_initialized(&self) -> std::io::Result<()> {
        self.init()?;
        self.update_gitignore()?;
        Ok(())
    }

    /// Append the data directory to .gitignore if:
    /// 1. A .gitignore file exists in the parent of data_dir
    /// 2. It doesn't already contain the entry
    pub fn update_gitignore(&self) -> std::io::Result<()> {
        let gitignore_dir = match self.root.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let gitignore_path = gitignore_dir.join(".gitignore");

        let dir_name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.root.to_string_lossy().to_string());
        let entry = format!("{dir_name}/");

        if !gitignore_path.exists() {
            return Ok(());
        }
        let contents = std::fs::read_to_string(&gitignore_path)?;
        let already_present = contents.lines().any(|line| {
            let trimmed = line.trim();
            trimmed == entry || trimmed == dir_name
        });
        if !already_present {
            let prefix = if contents.ends_with('\n') || contents.is_empty() {
                ""
            } else {
                "\n"
            };
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            use std::io::Write;
            writeln!(file, "{prefix}{entry}")?;
        }
        Ok(())
    }

    /// Take the exclusive session lock, so only one supervisor spawns and
    /// kills servers for this project. Released when the guard drops.
    pub fn acquire_lock(&self) -> Result<SessionLock, LockError> {
        let path = self.lock();
        self.init().map_err(|e| LockError::Io {
            path: self.root.clone(),
            source: e,
        })?;
        let file = File::create(&path).map_err(|e| LockError::Io {
            path: path.clone(),
            source: e,
        })?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "session lock acquired");
                Ok(SessionLock { file, path })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Err(LockError::Held { path }),
            Err(e) => Err(LockError::Io { path, source: e }),
        }
    }
}

/// Guard for the session lock.
#[derive(Debug)]
pub struct SessionLock {
    file: File,
    path: PathBuf,
}

impl SessionLock {
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Errors from taking the session lock.
#[derive(Debug)]
pub enum LockError {
    /// Another supervisor is running for this data directory.
    Held { path: PathBuf },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockError::Held { path } => write!(
                f,
                "another ozea session holds {}; stop it first",
                path.display()
            ),
            LockError::Io { path, source } => {
                write!(f, "failed to lock {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for LockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LockError::Held { .. } => None,
            LockError::Io { source, .. } => Some(source),
        }
    }
}
