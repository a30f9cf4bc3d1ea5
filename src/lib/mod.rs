//! Env file generation for git worktrees.
//!
//! This library builds one env file per worktree from a shared template and a
//! per-worktree input file, and links sub-packages of each worktree to that one
//! generated file.
//!
//! # Features
//!
//! - **Closed interpolation**: `${NAME}` is resolved only from the input file,
//!   never from the process environment
//! - **All-or-nothing generation**: every input is checked before any file is written
//! - **Deterministic output**: variables are sorted and quoted the same way on every run
//! - **Relative symlinks**: worktrees can be moved without breaking links
//! - **Optional tracing**: Detailed logging when the `tracing` feature is enabled
//!
//! # Example
//!
//! ```rust,no_run
//! use worktree_env::sync::{EnvSync, EnvSyncOptions};
//!
//! let options = EnvSyncOptions {
//!     config_file: None, // defaults to worktree-env.json
//!     base_dir: None,    // defaults to the current directory
//! };
//!
//! EnvSync::sync_with_options(options).unwrap();
//! ```
//!
//! The pure pieces can be used on their own:
//!
//! ```rust
//! use worktree_env::interpolate::interpolate;
//! use worktree_env::parse::EnvMapping;
//! use worktree_env::serialize::serialize;
//!
//! let input = EnvMapping::from("DATABASE_URL=postgres://localhost/wt1");
//! let resolved = interpolate("DB=${DATABASE_URL}?pool=5", &input).unwrap();
//!
//! assert_eq!(
//!     serialize(&EnvMapping::from(resolved.as_str())),
//!     "DB=\"postgres://localhost/wt1?pool=5\""
//! );
//! ```

pub mod config;
pub mod generate;
pub mod interpolate;
pub mod links;
pub mod parse;
pub mod serialize;
pub mod sync;
pub mod validate;
pub mod write;
