use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use worktree_env::config::DEFAULT_CONFIG_FILENAME;
use worktree_env::sync::{EnvSync, EnvSyncOptions};

#[derive(Parser)]
#[command(
  name = "worktree-env",
  about = "Generate env files for every git worktree from a shared template",
  version,
  author
)]
struct Cli {
  /// Config file, relative to the current directory
  #[arg(default_value = DEFAULT_CONFIG_FILENAME)]
  config: PathBuf,

  /// Verbose output (-v for debug, -vv for trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    1 => "debug",
    2 => "trace",
    _ => "info",
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  let options = EnvSyncOptions {
    config_file: Some(cli.config),
    base_dir: None,
  };

  match EnvSync::sync_with_options(options) {
    Ok(report) => {
      for warning in &report.warnings {
        eprintln!("warning: {warning}");
      }
      print!("{report}");
      ExitCode::SUCCESS
    }
    Err(err) => {
      eprintln!("Error: {err}");
      ExitCode::FAILURE
    }
  }
}
