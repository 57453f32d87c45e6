//! Configuration settings for DirSync
//!
//! Defines CLI arguments, runtime settings and their defaults.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of comparator workers
pub const DEFAULT_WORKERS: usize = 20;

/// Default capacity of each pipeline channel
pub const DEFAULT_QUEUE_SIZE: usize = 256;

/// DirSync - make a destination directory tree mirror a source tree
#[derive(Parser, Debug, Clone)]
#[command(name = "dirsync")]
#[command(author = "DirSync Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Concurrent one-way directory synchronization")]
#[command(long_about = r#"
DirSync copies every file from SOURCE into DESTINATION, overwriting files
whose content differs. Files already identical (same size and digest) are
left untouched. Nothing is ever deleted from DESTINATION.

Examples:
  dirsync -s /data -d /backup               # Basic sync
  dirsync -s /data -d /backup -v -e         # Verbose, keep empty directories
  dirsync -s /data -d /backup --dry-run     # Show what would be copied
  dirsync verify /data /backup              # Compare two trees
"#)]
pub struct CliArgs {
    /// Source directory
    #[arg(short = 's', long, value_name = "DIR", env = "DIRSYNC_SOURCE")]
    pub source: Option<PathBuf>,

    /// Destination directory
    #[arg(short = 'd', long, value_name = "DIR", env = "DIRSYNC_DESTINATION")]
    pub destination: Option<PathBuf>,

    /// Log every skip and absorbed error
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Create empty directories in the destination
    #[arg(short = 'e', long)]
    pub create_empty_dirs: bool,

    /// Number of comparator workers
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKERS, value_name = "NUM")]
    pub workers: usize,

    /// Capacity of the pipeline channels
    #[arg(long, default_value_t = DEFAULT_QUEUE_SIZE, value_name = "NUM")]
    pub queue_size: usize,

    /// Digest used to compare files of equal size
    #[arg(long, value_enum, default_value = "xxhash3", value_name = "ALGO")]
    pub hash: HashAlgorithm,

    /// Report what would be copied without copying
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Show a progress spinner
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Output format for the final summary
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compare two trees without modifying either
    #[command(name = "verify")]
    Verify {
        /// Source directory
        source: PathBuf,
        /// Destination directory
        destination: PathBuf,
        /// Hash algorithm
        #[arg(long, value_enum, default_value = "xxhash3")]
        algorithm: HashAlgorithm,
    },
}

/// Hash algorithm for content comparison
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// XXHash3 - Ultra fast, non-cryptographic (128-bit)
    #[default]
    #[value(name = "xxhash3")]
    XXHash3,
    /// XXHash64 - Fast, non-cryptographic (64-bit)
    #[value(name = "xxhash64")]
    XXHash64,
    /// BLAKE3 - Fast and cryptographically secure
    #[value(name = "blake3")]
    Blake3,
    /// SHA-256 - Standard cryptographic hash
    #[value(name = "sha256")]
    Sha256,
}

impl HashAlgorithm {
    /// Get the output size in bytes
    pub fn output_size(&self) -> usize {
        match self {
            Self::XXHash3 => 16,
            Self::XXHash64 => 8,
            Self::Blake3 => 32,
            Self::Sha256 => 32,
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::XXHash3 => "XXHash3",
            Self::XXHash64 => "XXHash64",
            Self::Blake3 => "BLAKE3",
            Self::Sha256 => "SHA-256",
        }
    }
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Runtime configuration for one sync session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Source root
    pub source: PathBuf,
    /// Destination root
    pub destination: PathBuf,
    /// Log skip and absorb decisions
    pub verbose: bool,
    /// Materialize empty source directories in the destination
    pub create_empty_dirs: bool,
    /// Comparator worker count
    pub workers: usize,
    /// Capacity of each pipeline channel
    pub queue_size: usize,
    /// Digest used for equal-size files
    pub hash: HashAlgorithm,
    /// Decide but do not copy
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            verbose: false,
            create_empty_dirs: false,
            workers: DEFAULT_WORKERS,
            queue_size: DEFAULT_QUEUE_SIZE,
            hash: HashAlgorithm::XXHash3,
            dry_run: false,
        }
    }
}

impl SyncConfig {
    /// Create a config for the given roots with default settings
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Default::default()
        }
    }

    /// Toggle verbose diagnostics
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Toggle creation of empty directories
    pub fn with_create_empty_dirs(mut self, enable: bool) -> Self {
        self.create_empty_dirs = enable;
        self
    }

    /// Set the comparator worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the content digest
    pub fn with_hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self
    }

    /// Toggle dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Create config from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        let source = args.source.clone().ok_or("Source path required (-s)")?;
        let destination = args
            .destination
            .clone()
            .ok_or("Destination path required (-d)")?;

        let config = Self {
            source,
            destination,
            verbose: args.verbose,
            create_empty_dirs: args.create_empty_dirs,
            workers: args.workers,
            queue_size: args.queue_size,
            hash: args.hash,
            dry_run: args.dry_run,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check numeric settings
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("Worker count must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.workers, 20);
        assert!(!config.verbose);
        assert!(!config.create_empty_dirs);
        assert_eq!(config.hash, HashAlgorithm::XXHash3);
    }

    #[test]
    fn test_from_cli() {
        let args = CliArgs::parse_from(["dirsync", "-s", "/src", "-d", "/dst", "-v", "-e", "--workers", "4"]);
        let config = SyncConfig::from_cli(&args).unwrap();
        assert_eq!(config.source, PathBuf::from("/src"));
        assert_eq!(config.destination, PathBuf::from("/dst"));
        assert!(config.verbose);
        assert!(config.create_empty_dirs);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_from_cli_requires_roots() {
        let args = CliArgs::parse_from(["dirsync", "-s", "/src"]);
        assert!(SyncConfig::from_cli(&args).is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = SyncConfig::new("/a", "/b").with_workers(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hash_algorithm() {
        assert_eq!(HashAlgorithm::XXHash3.output_size(), 16);
        assert_eq!(HashAlgorithm::Blake3.output_size(), 32);
        assert_eq!(HashAlgorithm::Sha256.name(), "SHA-256");
    }

    #[test]
    fn test_config_serializes() {
        let config = SyncConfig::new("/a", "/b").with_hash(HashAlgorithm::Blake3);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"blake3\""));
        let back: SyncConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hash, HashAlgorithm::Blake3);
    }
}
