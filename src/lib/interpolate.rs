//! `${NAME}` substitution.
//!
//! Names are resolved only against the mapping handed to [`interpolate`]. The
//! process environment is never read, so a template mentioning `${HOME}` or
//! `${PATH}` gets the values from the input file or fails.
//!
//! Substitution is literal and happens once: a value that itself contains
//! `${...}` is written out unchanged.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::parse::EnvMapping;

static REFERENCE_REGEX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").expect("Invalid reference regex"));

/// Names referenced as `${NAME}` in `text`, in order of appearance, duplicates included.
pub fn references(text: &str) -> impl Iterator<Item = &str> {
  REFERENCE_REGEX
    .captures_iter(text)
    .filter_map(|caps| caps.get(1))
    .map(|m| m.as_str())
}

/// Replaces every `${NAME}` in `text` with its value from `vars`.
///
/// All references are checked before anything is replaced; if any name is
/// missing the error lists every missing name, sorted and without duplicates.
pub fn interpolate(text: &str, vars: &EnvMapping) -> Result<String, InterpolateError> {
  let missing: BTreeSet<&str> = references(text).filter(|name| !vars.contains_key(name)).collect();

  if !missing.is_empty() {
    return Err(InterpolateError::MissingVariables(
      missing.into_iter().map(str::to_string).collect(),
    ));
  }

  let replaced = REFERENCE_REGEX.replace_all(text, |caps: &Captures| {
    let name = &caps[1];
    #[cfg(feature = "tracing")]
    trace!("Substituting ${{{}}}", name);
    vars.get(name).unwrap_or_default().to_string()
  });

  Ok(replaced.into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpolateError {
  /// Referenced names that the variable set does not define
  #[error("missing variable(s): {}", .0.join(", "))]
  MissingVariables(Vec<String>),
}
