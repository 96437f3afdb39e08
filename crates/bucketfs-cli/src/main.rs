//! bucketfs - Command-line interface for bucketfs
//!
//! Reads, writes, renames and removes objects in an S3-style bucket using
//! filesystem paths, against S3, a local directory or an in-memory store.

use anyhow::{Context, Result};
use bucketfs_cloud::{CloudError, Config};
use bucketfs_core::{BucketFs, FailureKind};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

/// bucketfs - A filesystem view of an object storage bucket
#[derive(Parser)]
#[command(name = "bucketfs")]
#[command(author, version, about = "A filesystem view of an object storage bucket", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true, env = "BUCKETFS_CONFIG")]
    config: Option<PathBuf>,

    /// Bucket to operate on, overriding the configured one
    #[arg(short, long, global = true)]
    bucket: Option<String>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print an object to stdout
    Cat {
        /// Path of the object
        path: String,
    },

    /// Upload a file, or stdin, to a path
    Put {
        /// Destination path
        path: String,

        /// Local file to upload (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Show object metadata
    Stat {
        /// Path of the object
        path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rename an object (copy, then delete the original)
    Mv {
        /// Current path
        old: String,

        /// New path
        new: String,
    },

    /// Remove an object
    Rm {
        /// Path of the object
        path: String,
    },

    /// Remove every object whose key starts with a prefix
    RmAll {
        /// Key prefix
        prefix: String,
    },

    /// List keys under a prefix
    Ls {
        /// Key prefix (whole bucket when omitted)
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Create a directory (directories are implicit in key names)
    Mkdir {
        /// Directory path
        path: String,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let result = run();

    match result {
        Ok(_) => process::exit(0),
        Err(e) => {
            error!("Error: {:#}", e);

            let exit_code = map_error_to_exit_code(&e);
            process::exit(exit_code);
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Commands::Init { force } = cli.command {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => Config::config_path()?,
        };
        return commands::init(&path, force);
    }

    let config = load_config(cli.config.as_deref())?;
    let fs = open_fs(&config, cli.bucket.as_deref())?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Cat { path } => commands::cat(&fs, &path),
        Commands::Put { path, file } => commands::put(&fs, &path, file.as_deref()),
        Commands::Stat { path, json } => commands::stat(&fs, &path, json),
        Commands::Mv { old, new } => commands::mv(&fs, &old, &new),
        Commands::Rm { path } => commands::rm(&fs, &path),
        Commands::RmAll { prefix } => commands::rm_all(&fs, &prefix),
        Commands::Ls { prefix } => commands::ls(&fs, &prefix),
        Commands::Mkdir { path } => commands::mkdir(&fs, &path),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::load()?),
    }
}

fn open_fs(config: &Config, bucket: Option<&str>) -> Result<BucketFs> {
    bucketfs_cloud::connect(config, bucket).context("Failed to open bucket")
}

fn map_error_to_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(fs_err) = err.downcast_ref::<bucketfs_core::Error>() {
        fs_exit_code(fs_err)
    } else if let Some(cloud_err) = err.downcast_ref::<CloudError>() {
        match cloud_err {
            CloudError::Fs(fs_err) => fs_exit_code(fs_err),
            CloudError::InvalidUrl(_) => 3,
            CloudError::Io(_) | CloudError::Config(_) | CloudError::Runtime(_) => 1,
        }
    } else {
        1
    }
}

fn fs_exit_code(err: &bucketfs_core::Error) -> i32 {
    use bucketfs_core::Error;

    match err {
        Error::InvalidPath(_) | Error::InvalidBucketName(_) => 3,
        Error::BucketInaccessible { .. } | Error::BucketCreateFailed { .. } => 4,
        Error::RenameIncomplete { .. } | Error::RemoveAllFailed { .. } => 6,
        _ => match err.kind() {
            Some(FailureKind::NotFound) => 2,
            Some(FailureKind::AccessDenied) => 4,
            Some(FailureKind::Transient) => 5,
            Some(FailureKind::Unknown) | None => 1,
        },
    }
}
