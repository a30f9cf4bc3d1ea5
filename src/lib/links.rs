//! Which symlinks should point at which generated file.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::config::Config;

/// Generated file path → symlink paths that must resolve to it.
pub type LinkPlan = BTreeMap<PathBuf, Vec<PathBuf>>;

/// Places every configured symlink under each target folder. Pure, no I/O.
pub fn plan(config: &Config) -> LinkPlan {
  config
    .target_folders
    .values()
    .map(|folder| {
      let links = config
        .symlinks
        .iter()
        .map(|relative| Path::new(folder).join(relative))
        .collect();
      (config.output_path(folder), links)
    })
    .collect()
}

/// Drops `.` components, so `./wt/` and `wt` compare equal.
pub fn normalize(path: &Path) -> PathBuf {
  path
    .components()
    .filter(|c| *c != Component::CurDir)
    .collect()
}
