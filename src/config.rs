use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Top-level configuration loaded from ozea.toml.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
#[derive(Default)]
pub struct OzeaConfig {
    pub server: ServerConfig,
    pub urls: UrlConfig,
    pub build: BuildConfig,
    pub watch: WatchConfig,
    pub storage: StorageConfig,
    pub serve: ServeConfig,
}

/// Which half of the application this session serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Server,
    Client,
}

/// Where build completion events come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON lines written by the bundler on our stdin.
    Stdin,
    /// Poll the emitted artifacts for modification.
    Poll,
}

/// How the built server entry is launched.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub runtime: String,
    pub dist_dir: PathBuf,
    pub entry: String,
    pub cwd: PathBuf,
    pub inspect: bool,
    pub exec_args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UrlConfig {
    pub server_url: Url,
    pub assets_url: Url,
    pub api_url: Url,
    pub public_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    pub target: Target,
    pub debug: bool,
    pub verbose: bool,
    pub staging: bool,
    pub force_polyfill: bool,
    pub render_html: bool,
    pub src_dir: PathBuf,
    pub styles_dir: PathBuf,
    pub modules_dir: PathBuf,
    pub assets_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    pub source: SourceKind,
    /// Glob polled by the `poll` source. Defaults to every script under the
    /// server's dist directory.
    pub pattern: Option<String>,
    pub check_interval_ms: u64,
    pub settle_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServeConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

// --- Default implementations ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            runtime: "node".to_string(),
            dist_dir: PathBuf::from("dist"),
            entry: "server.js".to_string(),
            cwd: PathBuf::from("."),
            inspect: false,
            exec_args: Vec::new(),
            env: BTreeMap::new(),
        }
    }
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            server_url: default_url("http://localhost:8000/"),
            assets_url: default_url("http://localhost:7000/assets/"),
            api_url: default_url("http://localhost:8000/api/"),
            public_path: "/assets/".to_string(),
        }
    }
}

fn default_url(raw: &str) -> Url {
    Url::parse(raw).expect("built-in default URL is valid")
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            target: Target::Server,
            debug: true,
            verbose: false,
            staging: false,
            force_polyfill: false,
            render_html: true,
            src_dir: PathBuf::from("src"),
            styles_dir: PathBuf::from("styles"),
            modules_dir: PathBuf::from("node_modules"),
            assets_dir: PathBuf::from("assets"),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Stdin,
            pattern: None,
            check_interval_ms: 250,
            settle_ms: 300,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".ozea"),
        }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "127.0.0.1".to_string(),
            port: 8422,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub target: Option<Target>,
    pub source: Option<SourceKind>,
    pub dist_dir: Option<PathBuf>,
    pub entry: Option<String>,
    pub cwd: Option<PathBuf>,
    pub inspect: bool,
    pub verbose: bool,
}

impl OzeaConfig {
    /// Load config from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        Self::parse(&contents).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: None,
            source: e,
        })
    }

    /// Merge CLI flags over file values. Boolean flags can only switch a
    /// setting on.
    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(target) = overrides.target {
            self.build.target = target;
        }
        if let Some(source) = overrides.source {
            self.watch.source = source;
        }
        if let Some(dist_dir) = &overrides.dist_dir {
            self.server.dist_dir = dist_dir.clone();
        }
        if let Some(entry) = &overrides.entry {
            self.server.entry = entry.clone();
        }
        if let Some(cwd) = &overrides.cwd {
            self.server.cwd = cwd.clone();
        }
        if overrides.inspect {
            self.server.inspect = true;
        }
        if overrides.verbose {
            self.build.verbose = true;
        }
    }

    /// Glob polled by the `poll` source.
    pub fn watch_pattern(&self) -> String {
        match &self.watch.pattern {
            Some(pattern) => pattern.clone(),
            None => self
                .server
                .dist_dir
                .join("**")
                .join("*.js")
                .to_string_lossy()
                .into_owned(),
        }
    }
}

/// Errors from loading the config file.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse {
                path: Some(path),
                source,
            } => write!(f, "invalid config {}: {}", path.display(), source),
            ConfigError::Parse { path: None, source } => write!(f, "invalid config: {}", source),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}
