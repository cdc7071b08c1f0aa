mod config;
mod data_dir;
mod elapsed;
mod launcher;
mod profile;
mod reporter;
mod runner;
#[cfg(feature = "serve")]
mod serve;
mod signals;
mod source;
mod status;
mod supervisor;
#[cfg(test)]
mod testing;

use clap::Parser;
use config::{CliOverrides, OzeaConfig, SourceKind, Target};
use std::path::PathBuf;
use std::process::ExitCode;

/// Development supervisor for a bundled web application: restarts the
/// freshly built node server every time the bundler finishes a rebuild.
#[derive(Parser, Debug)]
#[command(name = "ozea", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "ozea.toml")]
    config: PathBuf,

    /// Which bundle this session follows (overrides config)
    #[arg(short, long, value_enum)]
    target: Option<Target>,

    /// Where build completion events come from (overrides config)
    #[arg(short, long, value_enum)]
    source: Option<SourceKind>,

    /// Directory the server bundle is emitted to (overrides config)
    #[arg(long)]
    dist: Option<PathBuf>,

    /// Server entry file name inside the dist directory (overrides config)
    #[arg(long)]
    entry: Option<String>,

    /// Working directory for the server process (overrides config)
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Start the server with the debugger attached
    #[arg(long)]
    inspect: bool,

    /// Print the bundler build profile for a target as JSON and exit
    #[arg(long, value_enum, value_name = "TARGET")]
    plan: Option<Target>,

    /// Validate config and print resolved settings, don't run
    #[arg(long)]
    dry_run: bool,

    /// Print the running session's status and exit
    #[arg(long)]
    status: bool,

    /// Extra logging, and relay all bundler output
    #[arg(short, long)]
    verbose: bool,

    /// Only warnings and errors in the log
    #[arg(short, long)]
    quiet: bool,

    /// Disable coloured glyphs
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    /// Glyphs are coloured unless `--no-color` is given or `NO_COLOR` is set.
    fn color(&self, no_color_env: Option<&std::ffi::OsStr>) -> bool {
        !self.no_color && no_color_env.is_none()
    }

    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            target: self.target,
            source: self.source,
            dist_dir: self.dist.clone(),
            entry: self.entry.clone(),
            cwd: self.cwd.clone(),
            inspect: self.inspect,
            verbose: self.verbose,
        }
    }

    fn log_filter(&self) -> &'static str {
        if self.verbose {
            "ozea=debug"
        } else if self.quiet {
            "ozea=warn"
        } else {
            "ozea=info"
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_filter())),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    let mut config = match OzeaConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    config.apply_overrides(&cli.overrides());

    if let Some(target) = cli.plan {
        let node_env = std::env::var("NODE_ENV").unwrap_or_else(|_| "development".to_string());
        return match profile::BuildProfile::new(&config, target, &node_env).and_then(|p| p.to_json()) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if cli.status {
        return print_status(&config);
    }

    if cli.dry_run {
        return match toml::to_string_pretty(&config) {
            Ok(resolved) => {
                println!("# Dry run: resolved configuration, not running.");
                print!("{resolved}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: failed to render config: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let color = cli.color(std::env::var_os("NO_COLOR").as_deref());
    match runner::run(&config, color).await {
        Ok(outcome) => {
            tracing::info!(?outcome, "session ended");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_status(config: &OzeaConfig) -> ExitCode {
    let data_dir = data_dir::DataDir::new(&config.storage.data_dir);
    match status::StatusFile::new(data_dir.status()).read() {
        Ok(Some(data)) => match serde_json::to_string_pretty(&data) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
        Ok(None) => {
            println!("No ozea session running.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
