//! Checks run across all parsed inputs before anything is generated.

use std::collections::BTreeSet;
use std::fmt;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::interpolate::references;
use crate::parse::EnvMapping;

/// Requires every input file to define exactly the same keys.
///
/// The first input is the reference. Nothing is checked with fewer than two inputs.
pub fn check_key_sets<P>(inputs: &[(P, &EnvMapping<'_>)]) -> Result<(), ValidationError>
where
  P: AsRef<str>,
{
  let Some(((reference_path, reference), rest)) = inputs.split_first() else {
    return Ok(());
  };
  let expected: BTreeSet<&str> = reference.keys().collect();

  for (path, mapping) in rest {
    let actual: BTreeSet<&str> = mapping.keys().collect();
    if actual == expected {
      continue;
    }

    #[cfg(feature = "tracing")]
    debug!(file = path.as_ref(), "Key set differs from {}", reference_path.as_ref());

    return Err(ValidationError::InconsistentKeys {
      file: path.as_ref().to_string(),
      reference: reference_path.as_ref().to_string(),
      missing: expected.difference(&actual).map(|k| k.to_string()).collect(),
      extra: actual.difference(&expected).map(|k| k.to_string()).collect(),
    });
  }

  Ok(())
}

/// Lists the input keys that the template never references as `${NAME}`.
pub fn unused_variables(file: &str, input: &EnvMapping, template_text: &str) -> Vec<Warning> {
  let referenced: BTreeSet<&str> = references(template_text).collect();

  input
    .keys()
    .filter(|key| !referenced.contains(key))
    .map(|key| Warning::UnusedVariable {
      file: file.to_string(),
      key: key.to_string(),
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  /// An input file does not define the same keys as the reference input
  #[error(
    "inconsistent keys in {file} (compared to {reference}): missing [{}], extra [{}]",
    .missing.join(", "),
    .extra.join(", ")
  )]
  InconsistentKeys {
    file: String,
    reference: String,
    missing: Vec<String>,
    extra: Vec<String>,
  },
}

/// Non-fatal findings. Generation goes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
  UnusedVariable { file: String, key: String },
}

impl fmt::Display for Warning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Warning::UnusedVariable { file, key } => {
        write!(f, "unused variable {} in {}: not referenced by the template", key, file)
      }
    }
  }
}
