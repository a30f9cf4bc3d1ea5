//! Filesystem side of a run: writes generated files and creates symlinks.
//!
//! All paths handed in are relative to the writer's base directory. Symlinks
//! are created with relative targets, computed from the link's own directory,
//! so a worktree can be moved without breaking them.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::generate::GeneratedFile;
use crate::links::{LinkPlan, normalize};

/// A symlink that was put in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLink {
  /// Link location, relative to the base directory
  pub link: PathBuf,
  /// What the link points to, relative to the link's directory
  pub target: PathBuf,
}

pub struct Writer {
  base: PathBuf,
}

impl Writer {
  pub fn new<P: Into<PathBuf>>(base: P) -> Self {
    Self { base: base.into() }
  }

  /// Writes every file, creating parent directories as needed.
  pub fn write_files(&self, files: &[GeneratedFile]) -> Result<(), WriteError> {
    for file in files {
      let path = self.base.join(&file.path);

      #[cfg(feature = "tracing")]
      debug!(?path, "Writing generated file");

      create_parent(&path)?;
      std::fs::write(&path, &file.content).map_err(|source| WriteError::WriteFile { path, source })?;
    }

    Ok(())
  }

  /// Creates every planned symlink, replacing whatever file or link is already there.
  ///
  /// A plan with a link on top of a generated file is refused before any link is made.
  pub fn create_links(&self, plan: &LinkPlan) -> Result<Vec<CreatedLink>, WriteError> {
    let generated: BTreeSet<PathBuf> = plan.keys().map(|path| normalize(path)).collect();
    if let Some(link) = plan
      .values()
      .flatten()
      .find(|link| generated.contains(&normalize(link)))
    {
      return Err(WriteError::LinkOverGeneratedFile(link.clone()));
    }

    let mut created = Vec::new();

    for (generated, links) in plan {
      for link in links {
        let link_dir = link.parent().unwrap_or_else(|| Path::new(""));
        let target = relative_path(link_dir, generated);
        let path = self.base.join(link);

        create_parent(&path)?;
        remove_existing(&path)?;

        #[cfg(feature = "tracing")]
        debug!(?path, ?target, "Creating symlink");

        create_symlink(&target, &path).map_err(|source| WriteError::CreateLink {
          path: path.clone(),
          source,
        })?;

        created.push(CreatedLink {
          link: link.clone(),
          target,
        });
      }
    }

    Ok(created)
  }
}

fn create_parent(path: &Path) -> Result<(), WriteError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent).map_err(|source| WriteError::CreateDir {
      path: parent.to_path_buf(),
      source,
    })?;
  }
  Ok(())
}

/// Removes a file or symlink at `path`. A real directory is left alone and reported.
fn remove_existing(path: &Path) -> Result<(), WriteError> {
  let Ok(meta) = std::fs::symlink_metadata(path) else {
    return Ok(());
  };

  if meta.is_dir() && !meta.is_symlink() {
    return Err(WriteError::DirectoryInTheWay(path.to_path_buf()));
  }

  #[cfg(feature = "tracing")]
  trace!(?path, "Removing existing entry");

  remove_symlink(path, &meta).map_err(|source| WriteError::RemoveExisting {
    path: path.to_path_buf(),
    source,
  })
}

/// Directory symlinks on Windows have to be removed with `remove_dir`.
fn remove_symlink(path: &Path, meta: &std::fs::Metadata) -> std::io::Result<()> {
  #[cfg(windows)]
  {
    use std::os::windows::fs::MetadataExt;
    if meta.file_attributes() & 0x10 != 0 {
      return std::fs::remove_dir(path);
    }
  }
  #[cfg(not(windows))]
  let _ = meta;

  std::fs::remove_file(path)
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
  std::os::windows::fs::symlink_file(target, link)
}

/// Path from directory `from` to `to`, both relative to the same base.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
  let from: Vec<Component> = from.components().filter(|c| *c != Component::CurDir).collect();
  let to: Vec<Component> = to.components().filter(|c| *c != Component::CurDir).collect();

  let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

  let mut relative = PathBuf::new();
  for _ in common..from.len() {
    relative.push(Component::ParentDir);
  }
  for component in &to[common..] {
    relative.push(component);
  }
  relative
}

/// Errors raised while touching the filesystem. Nothing written before the
/// failure is rolled back.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
  /// Could not create a parent directory
  #[error("Failed to create directory {}: {source}", .path.display())]
  CreateDir {
    path: PathBuf,
    source: std::io::Error,
  },
  /// Could not write a generated file
  #[error("Failed to write {}: {source}", .path.display())]
  WriteFile {
    path: PathBuf,
    source: std::io::Error,
  },
  /// Could not remove the file or link that a new symlink replaces
  #[error("Failed to remove existing {}: {source}", .path.display())]
  RemoveExisting {
    path: PathBuf,
    source: std::io::Error,
  },
  /// Could not create a symlink
  #[error("Failed to create symlink {}: {source}", .path.display())]
  CreateLink {
    path: PathBuf,
    source: std::io::Error,
  },
  /// A directory sits where a symlink should go
  #[error("Cannot create symlink {}: a directory is in the way", .0.display())]
  DirectoryInTheWay(PathBuf),
  /// A planned link sits on a generated file
  #[error("Refusing to replace generated file {} with a symlink", .0.display())]
  LinkOverGeneratedFile(PathBuf),
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_relative_path() {
    assert_eq!(
      relative_path(Path::new("wt1/apps/web"), Path::new("wt1/.env.local")),
      PathBuf::from("../../.env.local")
    );
    assert_eq!(
      relative_path(Path::new("wt1"), Path::new("wt1/.env.local")),
      PathBuf::from(".env.local")
    );
    assert_eq!(
      relative_path(Path::new("./a/b"), Path::new("c/d")),
      PathBuf::from("../../c/d")
    );
    assert_eq!(
      relative_path(Path::new(""), Path::new("wt1/.env")),
      PathBuf::from("wt1/.env")
    );
  }

  #[test]
  fn test_write_files_creates_directories() {
    let temp_dir = TempDir::new().unwrap();
    let writer = Writer::new(temp_dir.path());

    writer
      .write_files(&[GeneratedFile {
        source: "a.env".into(),
        path: PathBuf::from("deep/nested/wt1/.env.local"),
        content: "# Input variables\n".into(),
      }])
      .unwrap();

    let written = std::fs::read_to_string(temp_dir.path().join("deep/nested/wt1/.env.local")).unwrap();
    assert_eq!(written, "# Input variables\n");
  }

  #[cfg(unix)]
  #[test]
  fn test_create_links_replaces_existing_entries() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    std::fs::create_dir_all(base.join("wt1/apps/web")).unwrap();
    std::fs::create_dir_all(base.join("wt1/apps/api")).unwrap();
    std::fs::write(base.join("wt1/.env.local"), "A=\"1\"").unwrap();
    std::fs::write(base.join("wt1/apps/web/.env.local"), "stale copy").unwrap();
    std::os::unix::fs::symlink("nowhere", base.join("wt1/apps/api/.env")).unwrap();

    let plan = LinkPlan::from([(
      PathBuf::from("wt1/.env.local"),
      vec![
        PathBuf::from("wt1/apps/web/.env.local"),
        PathBuf::from("wt1/apps/api/.env"),
        PathBuf::from("wt1/packages/db/.env"),
      ],
    )]);

    let created = Writer::new(base).create_links(&plan).unwrap();

    assert_eq!(created.len(), 3);
    for link in ["wt1/apps/web/.env.local", "wt1/apps/api/.env", "wt1/packages/db/.env"] {
      let path = base.join(link);
      assert!(std::fs::symlink_metadata(&path).unwrap().is_symlink());
      assert_eq!(std::fs::read_to_string(&path).unwrap(), "A=\"1\"");
    }
    assert_eq!(
      std::fs::read_link(base.join("wt1/apps/web/.env.local")).unwrap(),
      PathBuf::from("../../.env.local")
    );
  }

  #[test]
  fn test_link_over_generated_file_is_refused() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    std::fs::create_dir_all(base.join("wt1")).unwrap();
    std::fs::write(base.join("wt1/.env.local"), "A=\"1\"").unwrap();

    let plan = LinkPlan::from([(
      PathBuf::from("wt1/.env.local"),
      vec![PathBuf::from("wt1/apps/.env"), PathBuf::from("./wt1/.env.local")],
    )]);

    let err = Writer::new(base).create_links(&plan).unwrap_err();

    assert!(matches!(err, WriteError::LinkOverGeneratedFile(_)));
    assert_eq!(std::fs::read_to_string(base.join("wt1/.env.local")).unwrap(), "A=\"1\"");
    assert!(!base.join("wt1/apps").exists());
  }

  #[test]
  fn test_directory_in_the_way() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    std::fs::create_dir_all(base.join("wt1/.env")).unwrap();

    let plan = LinkPlan::from([(
      PathBuf::from("wt1/.env.local"),
      vec![PathBuf::from("wt1/.env")],
    )]);

    let err = Writer::new(base).create_links(&plan).unwrap_err();

    assert!(matches!(err, WriteError::DirectoryInTheWay(_)));
  }
}
