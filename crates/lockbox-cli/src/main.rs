//! lockbox: encrypt and decrypt files at rest with a password
//!
//!   lockbox -p <password> notes.txt photo.jpg      encrypt two files
//!   lockbox -p <password> -u notes.txt.enc         decrypt
//!   lockbox -p <password> -d -r ~/private          encrypt a directory tree

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use lockbox_batch::{BatchProcessor, BatchRequest, LocalFs, NamingPolicy, ProgressFn, TracingReporter};
use lockbox_core::config::LockboxConfig;
use lockbox_core::{BatchMode, BatchOutcome};
use lockbox_crypto::OsRandom;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "lockbox",
    version,
    about = "Password-based file encryption",
    long_about = "lockbox: encrypt or decrypt files and directory trees with AES-256-GCM \
                  using a key derived from a password"
)]
struct Cli {
    /// Password used to derive the encryption key
    #[arg(long, short = 'p', env = "LOCKBOX_PASSWORD", hide_env_values = true)]
    password: String,

    /// Decrypt instead of encrypt
    #[arg(long, short = 'u')]
    unlock: bool,

    /// Treat directory arguments as the set of files they contain
    #[arg(long, short = 'd')]
    dir: bool,

    /// Descend into subdirectories (requires --dir)
    #[arg(long, short = 'r', requires = "dir")]
    recursive: bool,

    /// Path to lockbox.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "LOCKBOX_CONFIG",
        default_value = "~/.config/lockbox/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "LOCKBOX_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "LOCKBOX_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Files (or, with --dir, directories) to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    let password = SecretString::from(std::mem::take(&mut cli.password));

    let config_path = expand_tilde(&cli.config);
    let config = LockboxConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| parse_log_format(&config.log.format));
    init_logging(&level, &format);

    let mode = if cli.unlock {
        BatchMode::Decrypt
    } else {
        BatchMode::Encrypt
    };
    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = ?mode,
        inputs = cli.paths.len(),
        config = %config_path.display(),
        config_source = config_source(&config_path),
        "lockbox starting"
    );

    let request = BatchRequest {
        paths: cli.paths,
        directory_mode: cli.dir,
        recursive: cli.recursive,
    };

    let outcome = run_batch(&config, mode, &request, &password, !cli.no_progress)?;
    print_summary(mode, &outcome);
    Ok(())
}

fn run_batch(
    config: &LockboxConfig,
    mode: BatchMode,
    request: &BatchRequest,
    password: &SecretString,
    show_progress: bool,
) -> Result<BatchOutcome> {
    let pb = make_progress_bar(show_progress);
    let pb_clone = pb.clone();
    let progress: ProgressFn = Box::new(move |done, total, msg| {
        pb_clone.set_length(total);
        pb_clone.set_position(done);
        pb_clone.set_message(msg.to_string());
    });

    let reporter = TracingReporter;
    let mut processor = BatchProcessor::new(LocalFs, OsRandom, &reporter)
        .with_naming(NamingPolicy::from_config(&config.naming))
        .with_associated_data(config.crypto.associated_data.as_bytes().to_vec())
        .with_progress(&progress);

    let result = processor.run(mode, request, password);
    pb.finish_and_clear();

    result.with_context(|| format!("batch aborted while {} files", mode_gerund(mode)))
}

// ── Config & logging ──────────────────────────────────────────────────────────

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}

/// Where the effective configuration came from
fn config_source(path: &Path) -> &'static str {
    if path.exists() {
        "file"
    } else {
        "defaults"
    }
}

fn parse_log_format(s: &str) -> LogFormat {
    if s.eq_ignore_ascii_case("json") {
        LogFormat::Json
    } else {
        LogFormat::Text
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Progress & output ─────────────────────────────────────────────────────────

fn make_progress_bar(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix("lockbox");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn mode_gerund(mode: BatchMode) -> &'static str {
    match mode {
        BatchMode::Encrypt => "encrypting",
        BatchMode::Decrypt => "decrypting",
    }
}

fn summary_line(mode: BatchMode, outcome: &BatchOutcome) -> String {
    let verb = mode.verb();
    let mut verb_cap = verb[..1].to_ascii_uppercase();
    verb_cap.push_str(&verb[1..]);
    format!(
        "{verb_cap} {} file(s); skipped {}, failed {}",
        outcome.processed(),
        outcome.skipped,
        outcome.failed
    )
}

fn print_summary(mode: BatchMode, outcome: &BatchOutcome) {
    for (input, output) in outcome.succeeded.iter().zip(&outcome.outputs) {
        println!("  {} → {}", input.display(), output.display());
    }
    println!("{}", summary_line(mode, outcome));
}
