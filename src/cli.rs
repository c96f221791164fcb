//! CLI argument parsing with clap

use crate::config::{DuplicateHandling, ImportSettings};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Photo Importer - Sort photos and videos into dated folders
///
/// Determines when each file was taken from GPS and EXIF metadata, the
/// file name, and file system timestamps, then moves or copies it into a
/// tree laid out by a naming pattern such as `yyyy/yyyyMMdd/HHmmss`.
#[derive(Parser, Debug)]
#[command(name = "photo-importer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory to scan for media files
    #[arg(short, long, global = true)]
    pub source: Option<PathBuf>,

    /// Root of the organized tree (defaults to the source directory)
    #[arg(short, long, global = true)]
    pub destination: Option<PathBuf>,

    /// Only import files directly inside the source directory
    #[arg(long, global = true)]
    pub no_recursive: bool,

    /// Naming pattern: directory levels and file name separated by '/'
    ///
    /// Tokens: yyyy yy MM M dd d HH H mm m ss s. Anything else is copied
    /// verbatim.
    #[arg(short, long, global = true)]
    pub pattern: Option<String>,

    /// Dry run mode - show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Copy files instead of moving them
    #[arg(long)]
    pub preserve: bool,

    /// What to do when the target file already exists
    #[arg(long, value_enum)]
    pub duplicates: Option<DuplicateHandling>,

    /// Number of threads for target previews (0 = auto)
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    /// Ignore timestamps before this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_min_date, global = true)]
    pub min_date: Option<NaiveDateTime>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long, global = true)]
    pub json_log: bool,

    /// Write a JSON report of every file outcome to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write a sample configuration file to this path and exit
    #[arg(long)]
    pub init_config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show where each file would go without touching anything
    Preview,
}

fn parse_min_date(value: &str) -> Result<NaiveDateTime, String> {
    ImportSettings::parse_minimum_date(value).map_err(|e| e.to_string())
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// True when a source directory was given directly or via a config file
    pub fn has_source(&self) -> bool {
        self.source.is_some() || self.config.is_some()
    }

    /// Merge CLI arguments with settings from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_settings(&self, mut settings: ImportSettings) -> ImportSettings {
        if let Some(ref source) = self.source {
            settings.source_dir = source.clone();
        }
        if let Some(ref destination) = self.destination {
            settings.destination_dir = Some(destination.clone());
        }
        if self.no_recursive {
            settings.recursive = false;
        }
        if let Some(ref pattern) = self.pattern {
            settings.naming_pattern = pattern.clone();
        }
        if self.dry_run {
            settings.dry_run = true;
        }
        if self.preserve {
            settings.preserve_originals = true;
        }
        if let Some(policy) = self.duplicates {
            settings.duplicate_handling = policy;
        }
        if let Some(threads) = self.threads {
            settings.max_parallelism = threads;
        }
        if let Some(min_date) = self.min_date {
            settings.minimum_valid_date = min_date;
        }

        settings
    }

    /// Convert CLI arguments to settings (when no config file is used)
    pub fn to_settings(&self) -> ImportSettings {
        self.merge_with_settings(ImportSettings::default())
    }
}
