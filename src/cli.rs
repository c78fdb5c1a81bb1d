use crate::config::{ResolvedConfig, ResolvedConfigFile};
use crate::errors::{AppError, AppResult};
use crate::models::{MirrorStats, ProbeOutcome};
use crate::updates::{discover_versions, mirror_packages, probe_version};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing::{error, info, warn};

// CLI metadata constants
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
const APP_ABOUT: &str = env!("CARGO_PKG_DESCRIPTION");

/// Parses command-line arguments and executes the mirror run.
///
/// This function handles two subcommands:
/// - `run`: Manual CLI with flags overriding the defaults
/// - `toml`: Run using a TOML configuration file
///
/// Both subcommands execute the same workflow:
/// 1. Fetches the reference changelog and extracts version identifiers
/// 2. Keeps the newest `tail_count` versions
/// 3. Probes each version's `pkg0.fpk` and skips unpublished ones
/// 4. Mirrors the package files of each published version to local disk
///
/// # Errors
///
/// Returns an error if the changelog cannot be fetched (fatal for the run),
/// the configuration is invalid, or local file operations fail. Individual
/// package failures are recorded and reported, not propagated.
pub async fn cli() -> AppResult<()> {
    let cmd = build_command();

    let mut cmd_for_help = cmd.clone();
    let matches = cmd.get_matches();

    match matches.subcommand() {
        Some(("run", sub)) => {
            let mut config = ResolvedConfig::default();
            if let Some(reference) = sub.get_one::<String>("reference") {
                config.reference_version = reference.clone();
            }
            if let Some(&tail) = sub.get_one::<usize>("tail") {
                if tail == 0 {
                    return Err(AppError::InvalidInput(
                        "Tail count must be greater than 0".into(),
                    ));
                }
                config.tail_count = tail;
            }
            if let Some(&max_index) = sub.get_one::<u32>("max_package_index") {
                config.max_package_index = max_index;
            }
            if let Some(output_dir) = sub.get_one::<PathBuf>("output_dir") {
                config.output_dir = output_dir.clone();
            }
            if let Some(base_url) = sub.get_one::<String>("base_url") {
                config.base_url = base_url.trim_end_matches('/').to_string();
            }
            if sub.get_flag("verbose") {
                config.verbose = true;
            }
            let list_only = sub.get_flag("list_only");

            init_tracing(config.verbose);
            run_workflow(&config, list_only).await?;
        }
        Some(("toml", sub)) => {
            let config_path = sub
                .get_one::<PathBuf>("config")
                .expect("config is required");

            let file_config = ResolvedConfigFile::from_toml_file(config_path)?;
            init_tracing(file_config.resolved.verbose);
            run_workflow(&file_config.resolved, file_config.list_only).await?;
        }
        _ => {
            cmd_for_help
                .print_help()
                .map_err(|e| AppError::IoError(format!("Failed to print help: {e}")))?;
        }
    }

    Ok(())
}

/// Builds the top-level command with its `run` and `toml` subcommands.
fn build_command() -> Command<'static> {
    Command::new("dmc-mirror")
        .version(APP_VERSION)
        .author(APP_AUTHOR)
        .about(APP_ABOUT)
        .subcommand(
            Command::new("run")
                .about("Discover firmware versions and mirror their packages")
                .after_help(
                    "Mirrors into <output-dir>/<host>/<remote path>.\nExample:\n  dmc-mirror run -t 5 -o data/mirror",
                )
                .arg(
                    Arg::new("reference")
                        .short('r')
                        .long("reference")
                        .help("Version whose changelog is fetched to enumerate releases")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("tail")
                        .short('t')
                        .long("tail")
                        .help("Process only the newest N changelog entries")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("max_package_index")
                        .short('m')
                        .long("max-package-index")
                        .help("Highest pkg<N>.fpk index tried per version")
                        .value_parser(clap::value_parser!(u32))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output-dir")
                        .help("Root of the local mirror tree")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("base_url")
                        .long("base-url")
                        .help("Vendor update endpoint (overrides the built-in host)")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("list_only")
                        .short('l')
                        .long("list-only")
                        .help("Print discovered versions and exit without mirroring")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .help("Emit per-URL diagnostics")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("toml")
                .about("Run using a TOML configuration file")
                .arg(
                    Arg::new("config")
                        .help("Path to the TOML config file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

/// Installs the stderr tracing subscriber. `RUST_LOG` wins when set;
/// otherwise `--verbose` selects debug over info.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_workflow(config: &ResolvedConfig, list_only: bool) -> AppResult<()> {
    let client = reqwest::Client::new();

    info!(
        reference = config.reference_version.as_str(),
        tail = config.tail_count,
        "Discovering versions"
    );
    let versions = discover_versions(&client, config).await?;

    if list_only {
        for version in &versions {
            println!("{version}");
        }
        return Ok(());
    }

    let mut totals = MirrorStats::default();
    let mut mirrored = 0usize;
    let mut skipped = 0usize;

    // One version at a time; only the package fetches within a version
    // run concurrently.
    for version in &versions {
        match probe_version(&client, config, version).await {
            ProbeOutcome::Available => {
                let stats = mirror_packages(&client, version, config).await?;
                totals.merge(&stats);
                mirrored += 1;
            }
            ProbeOutcome::NotFound => {
                warn!(version = version.as_str(), "Version not published, skipping");
                skipped += 1;
            }
            ProbeOutcome::FetchError(e) => {
                error!(
                    version = version.as_str(),
                    error = e.as_str(),
                    "Probe failed, skipping version"
                );
                skipped += 1;
            }
        }
    }

    info!(
        versions = versions.len(),
        mirrored = mirrored,
        skipped = skipped,
        downloaded = totals.downloaded,
        present = totals.already_present,
        absent = totals.absent,
        failed = totals.failed,
        "Run completed"
    );

    Ok(())
}
