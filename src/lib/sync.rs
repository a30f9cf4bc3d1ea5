//! One complete run: config in, env files and symlinks out.
//!
//! # Sync Logic
//!
//! The sync process:
//! 1. Loads the JSON config from the base directory
//! 2. Reads the template and every input file up front
//! 3. Generates all env files; any error stops the run before anything is written
//! 4. Writes the generated files, then creates the symlinks
//!
//! Writing is not transactional: if one folder fails, files already written for
//! other folders stay in place.
//!
//! # Examples
//!
//! ```rust,no_run
//! use worktree_env::sync::{EnvSync, EnvSyncOptions};
//! use std::path::PathBuf;
//!
//! let options = EnvSyncOptions {
//!     config_file: Some(PathBuf::from("worktree-env.json")),
//!     base_dir: None, // defaults to the current directory
//! };
//!
//! let report = EnvSync::sync_with_options(options).unwrap();
//! println!("{report}");
//! ```

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::config::{Config, ConfigError, DEFAULT_CONFIG_FILENAME};
use crate::generate::{FileContents, GenerateError, Generator};
use crate::links;
use crate::validate::Warning;
use crate::write::{CreatedLink, WriteError, Writer};

/// Main synchronization service for worktree env files.
pub struct EnvSync;

impl EnvSync {
  /// Runs a full sync using the provided options.
  pub fn sync_with_options(options: EnvSyncOptions) -> Result<SyncReport, EnvSyncError> {
    #[cfg(feature = "tracing")]
    info!("Starting env sync");

    let EnvSyncOptions {
      config_file,
      base_dir,
    } = options;

    let base_dir =
      base_dir.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let config_path =
      base_dir.join(config_file.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME)));

    #[cfg(feature = "tracing")]
    debug!(?base_dir, ?config_path, "Resolved paths");

    let config = Config::load(&config_path)?;
    let contents = Self::read_sources(&config, &base_dir)?;

    let generation = Generator::generate(&config, &contents)?;
    let plan = links::plan(&config);

    let writer = Writer::new(&base_dir);
    writer.write_files(&generation.files)?;
    let links = writer.create_links(&plan)?;

    #[cfg(feature = "tracing")]
    info!(
      files = generation.files.len(),
      links = links.len(),
      "Sync completed successfully"
    );

    Ok(SyncReport {
      template: config.template,
      files: generation
        .files
        .into_iter()
        .map(|file| (file.source, file.path))
        .collect(),
      links,
      warnings: generation.warnings,
    })
  }

  /// Reads the template and every input file named by the config.
  ///
  /// Files that do not exist are left out so generation can report which one
  /// is missing. Any other read failure stops the run.
  fn read_sources(config: &Config, base_dir: &Path) -> Result<FileContents, EnvSyncError> {
    let mut contents = FileContents::new();

    let paths = std::iter::once(&config.template).chain(config.target_folders.keys());
    for path in paths {
      let full_path = base_dir.join(path);
      match std::fs::read_to_string(&full_path) {
        Ok(text) => {
          contents.insert(path.clone(), text);
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
          #[cfg(feature = "tracing")]
          debug!(?full_path, "Source file does not exist");
        }
        Err(source) => {
          return Err(EnvSyncError::ReadSource {
            path: full_path,
            source,
          });
        }
      }
    }

    Ok(contents)
  }
}

/// What a successful run did. `Display` renders the summary without the warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
  pub template: String,
  /// Input file → generated file
  pub files: Vec<(String, PathBuf)>,
  pub links: Vec<CreatedLink>,
  pub warnings: Vec<Warning>,
}

impl fmt::Display for SyncReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Template: {}", self.template)?;

    writeln!(f, "Generated files:")?;
    for (source, path) in &self.files {
      writeln!(f, "  {} -> {}", source, path.display())?;
    }

    if !self.links.is_empty() {
      writeln!(f, "Symlinks:")?;
      for link in &self.links {
        writeln!(f, "  {} -> {}", link.link.display(), link.target.display())?;
      }
    }

    Ok(())
  }
}

/// Errors that can occur during a sync run.
#[derive(Debug, thiserror::Error)]
pub enum EnvSyncError {
  /// The config file is missing or invalid
  #[error(transparent)]
  Config(#[from] ConfigError),
  /// A source file exists but could not be read
  #[error("Failed to read {}: {source}", .path.display())]
  ReadSource {
    path: PathBuf,
    source: std::io::Error,
  },
  /// The env files could not be generated
  #[error(transparent)]
  Generate(#[from] GenerateError),
  /// Writing files or symlinks failed
  #[error(transparent)]
  Write(#[from] WriteError),
}

/// Configuration options for a sync run.
pub struct EnvSyncOptions {
  /// Config file, relative to the base directory. Defaults to `worktree-env.json`.
  pub config_file: Option<PathBuf>,
  /// Directory every configured path is relative to. Defaults to the current directory.
  pub base_dir: Option<PathBuf>,
}
