//! Photo Importer - Sort photos and videos into dated folders
//!
//! A CLI tool that resolves when each media file was taken from GPS and
//! EXIF metadata, file names and file system timestamps, and moves or
//! copies it into a tree laid out by a naming pattern.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use photo_importer::process::{ImportProgress, ImportRunResult, RunStatus, TargetPreview};
use photo_importer::{CancellationToken, Cli, Command, ImportSettings, Importer, OutcomeKind};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Conventional exit status after SIGINT
const EXIT_CANCELLED: u8 = 130;

// CLI Output Module
mod cli_output {
    //! Colored terminal output for summaries and results

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    /// Print a centered title
    pub fn print_title(title: &str) {
        let width: usize = 60;
        let padding = width.saturating_sub(title.len()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));

        let _ = stdout().execute(Print(&format!(
            "{}{} {}{}\n",
            left_pad,
            "╔".bold(),
            title.bold(),
            "╗".bold(),
        )));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_key_value(key: &str, value: &str, value_color: Option<Color>) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = match value_color {
            Some(color) => style(value).with(color),
            None => style(value).bold(),
        };
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = style(value).with(color).bold();
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    /// Print one result line: icon, source, then destination or message
    pub fn print_result(status_icon: &str, status_color: Color, source: &str, dest_or_msg: &str) {
        let icon_styled = style(status_icon).with(status_color).bold();
        let source_styled = style(source).italic();
        let msg_styled = style(dest_or_msg).with(CliTheme::HINT);

        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(icon_styled));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(source_styled));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(msg_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print("\n"));
        let _ = stdout().execute(Print(style("  📁 ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(style("Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let cli = Cli::parse();

    if let Some(ref path) = cli.init_config {
        std::fs::write(path, ImportSettings::sample_config())?;
        cli_output::print_hint(&format!("Sample configuration written to {}", path.display()));
        return Ok(ExitCode::SUCCESS);
    }

    // Get the executable directory for Config and Log directories
    let exe_dir = get_executable_dir()?;

    // Determine log file path based on config file or timestamp
    let log_path = get_log_path(&exe_dir, &cli);

    // Setup logging
    let guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Photo Importer starting");
    info!(log_file = %log_path.display(), "Log file location");

    let code = match run(&cli, &exe_dir, &log_path) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Import failed");
            cli_output::print_error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    };

    // Flush the log file before exiting
    drop(guard);
    Ok(code)
}

fn run(cli: &Cli, exe_dir: &Path, log_path: &Path) -> Result<ExitCode> {
    // Load settings
    let settings = load_settings(cli, exe_dir)?;
    if cli.verbose {
        info!(?settings, "Settings loaded");
    }

    let importer = Importer::new(settings)?;

    // Stop between files on Ctrl-C
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())?;

    let bar = progress_bar(cli.verbose);
    let bar_handle = bar.clone();
    let on_progress = move |progress: &ImportProgress| {
        bar_handle.set_length(progress.total as u64);
        bar_handle.set_position(progress.current as u64);
        bar_handle.set_message(progress.file_name.clone());
    };

    let cancelled = match cli.command {
        Some(Command::Preview) => {
            let files = importer
                .candidates()?
                .map(|candidate| candidate.map(|c| c.path().to_path_buf()))
                .collect::<photo_importer::Result<Vec<PathBuf>>>()?;
            let previews = importer.preview(&files, Some(&on_progress), &cancel)?;
            bar.finish_and_clear();
            print_previews(&previews);
            cancel.is_cancelled()
        }
        None => {
            let result = importer.run(Some(&on_progress), &cancel)?;
            bar.finish_and_clear();
            print_summary(&result, cli.verbose, importer.settings().dry_run);
            if let Some(ref report_path) = cli.report {
                result.save_report(report_path)?;
                info!(report = %report_path.display(), "Report written");
                cli_output::print_hint(&format!("Report written to {}", report_path.display()));
            }
            result.status == RunStatus::Cancelled
        }
    };

    // Print log file path
    cli_output::print_separator();
    cli_output::print_log_path(&log_path.display().to_string());

    if cancelled {
        cli_output::print_warning("Cancelled. Files already handled stay where they are.");
        return Ok(ExitCode::from(EXIT_CANCELLED));
    }
    Ok(ExitCode::SUCCESS)
}

fn progress_bar(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    ProgressBar::new(0).with_style(style)
}

fn print_summary(result: &ImportRunResult, verbose: bool, dry_run: bool) {
    use cli_output::*;

    // Print summary header
    print_separator();
    print_title("Import complete");
    print_separator();

    print_blank();
    print_stat("Found", &result.total_files.to_string(), CliTheme::ACCENT);
    print_stat("Succeeded", &result.succeeded.to_string(), CliTheme::SUCCESS);
    print_stat("Skipped", &result.skipped.to_string(), CliTheme::WARNING);
    print_stat(
        "Duplicates removed",
        &result.duplicates_removed.to_string(),
        CliTheme::ACCENT,
    );
    print_stat("Failed", &result.failed.to_string(), CliTheme::ERROR);
    print_stat("Elapsed", &format!("{:.1?}", result.elapsed), CliTheme::HINT);
    print_blank();

    // Print detailed results if verbose
    if verbose {
        print_separator();
        print_hint("Detailed results");
        print_blank();

        for outcome in &result.outcomes {
            let source = outcome.source.display().to_string();
            let dest = outcome
                .destination
                .as_ref()
                .map(|p| format!("→ {}", p.display()))
                .unwrap_or_default();
            let message = outcome.message.as_deref().unwrap_or_default();
            match outcome.kind {
                OutcomeKind::Success => print_result("✓", CliTheme::SUCCESS, &source, &dest),
                OutcomeKind::Skipped => print_result("⊘", CliTheme::WARNING, &source, message),
                OutcomeKind::DuplicateRemoved => {
                    print_result("≡", CliTheme::ACCENT, &source, &format!("{} {}", message, dest))
                }
                OutcomeKind::Failed => print_result("✗", CliTheme::ERROR, &source, message),
            }
        }
    }

    // Report failed files summary
    let failed: Vec<_> = result
        .outcomes
        .iter()
        .filter(|o| o.kind == OutcomeKind::Failed)
        .collect();

    if !failed.is_empty() {
        print_separator();
        print_error(&format!("Failed: {} files", failed.len()));
        print_blank();
        for outcome in &failed {
            print_key_value(
                &outcome.source.display().to_string(),
                outcome.message.as_deref().unwrap_or("Unknown error"),
                Some(CliTheme::ERROR),
            );
        }
    }

    if dry_run {
        print_separator();
        print_warning("Dry run: no files were moved, copied or deleted");
    }
}

fn print_previews(previews: &[TargetPreview]) {
    use cli_output::*;

    print_separator();
    print_title("Preview");
    print_separator();

    let mut planned = 0usize;
    for preview in previews {
        let source = preview.source.display().to_string();
        match &preview.planned {
            Ok(target) => {
                planned += 1;
                print_result(
                    "~",
                    CliTheme::ACCENT,
                    &source,
                    &format!(
                        "→ {} ({}, {})",
                        target.target.display(),
                        target.date,
                        target.date_source
                    ),
                );
            }
            Err(reason) => print_result("✗", CliTheme::ERROR, &source, reason),
        }
    }

    print_blank();
    print_stat("Planned", &planned.to_string(), CliTheme::SUCCESS);
    print_stat(
        "Unresolved",
        &(previews.len() - planned).to_string(),
        CliTheme::ERROR,
    );
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        let config_log_dir = log_dir.join(&config_name);
        let log_filename = format!("{}_{}.log", config_name, timestamp);
        config_log_dir.join(log_filename)
    } else {
        let log_filename = format!("ImportRun_{}.log", timestamp);
        log_dir.join(log_filename)
    }
}

/// Resolve config path - supports shorthand syntax
///
/// `-C family` finds `family`, `family.toml`, or `Config/family.toml` next
/// to the executable.
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let config_dir = exe_dir.join("Config");
    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());

    let mut in_config_dir = config_dir.join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load settings from file or CLI arguments
fn load_settings(cli: &Cli, exe_dir: &Path) -> Result<ImportSettings> {
    if !cli.has_source() {
        anyhow::bail!("No source directory given. Use --source <DIR> or --config <FILE>.");
    }

    let settings = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        info!(config_file = %resolved_path.display(), "Loading configuration from file");
        let file_settings = ImportSettings::load_from_file(&resolved_path)?;
        cli.merge_with_settings(file_settings)
    } else {
        cli.to_settings()
    };

    Ok(settings)
}

/// Setup logging (file + console)
///
/// The log file receives everything at the chosen level; the console only
/// shows warnings unless `--verbose` is set.
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<WorkerGuard> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let console_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(console_level),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(console_level),
            )
            .init();
    }

    Ok(guard)
}
