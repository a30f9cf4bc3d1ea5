//! The JSON run configuration.
//!
//! ```json
//! {
//!   "template": "env/.env.template",
//!   "outputFileName": ".env.local",
//!   "targetFolders": { "env/main.env": "main", "env/feature.env": "feature" },
//!   "symlinks": ["apps/web/.env.local"]
//! }
//! ```
//!
//! Every path is relative to the directory the tool runs in. The raw JSON is
//! checked against the schema before it is deserialized, so a bad file gets a
//! list of every problem instead of only the first one serde trips on.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::links::normalize;

#[cfg(feature = "tracing")]
use tracing::debug;

pub const DEFAULT_CONFIG_FILENAME: &str = "worktree-env.json";

const TEMPLATE: &str = "template";
const OUTPUT_FILE_NAME: &str = "outputFileName";
const TARGET_FOLDERS: &str = "targetFolders";
const SYMLINKS: &str = "symlinks";
const KNOWN_FIELDS: [&str; 4] = [TEMPLATE, OUTPUT_FILE_NAME, TARGET_FOLDERS, SYMLINKS];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
  /// Shared template file
  pub template: String,
  /// Name of the file generated inside each target folder
  pub output_file_name: String,
  /// Input file → folder that receives the generated file
  pub target_folders: BTreeMap<String, String>,
  /// Paths, relative to each target folder, that link to the generated file
  pub symlinks: Vec<String>,
}

impl Config {
  /// Reads and validates a config file.
  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();

    #[cfg(feature = "tracing")]
    debug!(?path, "Loading config");

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    Self::from_json(path, &contents)
  }

  /// Parses and validates config text. `path` is only used in diagnostics.
  pub fn from_json<P: AsRef<Path>>(path: P, contents: &str) -> Result<Self, ConfigError> {
    let path = path.as_ref();

    let value: Value = serde_json::from_str(contents).map_err(|source| ConfigError::Json {
      path: path.to_path_buf(),
      contents: contents.to_string(),
      source,
    })?;

    let violations = validate_schema(&value);
    if !violations.is_empty() {
      return Err(ConfigError::Schema {
        path: path.to_path_buf(),
        contents: contents.to_string(),
        violations,
      });
    }

    serde_json::from_value(value).map_err(|source| ConfigError::Json {
      path: path.to_path_buf(),
      contents: contents.to_string(),
      source,
    })
  }

  /// `folder/outputFileName`
  pub fn output_path(&self, folder: &str) -> PathBuf {
    Path::new(folder).join(&self.output_file_name)
  }
}

/// One schema problem, tied to the field it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
  pub field: String,
  pub message: String,
}

impl Violation {
  fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      field: field.into(),
      message: message.into(),
    }
  }
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.field, self.message)
  }
}

/// Collects every schema violation in a parsed config document.
pub fn validate_schema(value: &Value) -> Vec<Violation> {
  let Some(object) = value.as_object() else {
    return vec![Violation::new("(root)", "expected an object")];
  };

  let mut violations = Vec::new();

  for key in object.keys() {
    if !KNOWN_FIELDS.contains(&key.as_str()) {
      violations.push(Violation::new(key.as_str(), "unknown field"));
    }
  }

  if let Some(template) = required_string(object, TEMPLATE, &mut violations) {
    check_relative_path(TEMPLATE, template, &mut violations);
  }

  let output_name = required_string(object, OUTPUT_FILE_NAME, &mut violations);
  let output_name = match output_name {
    Some(name) if name.contains(['/', '\\']) || name == "." || name == ".." => {
      violations.push(Violation::new(OUTPUT_FILE_NAME, "must be a file name, not a path"));
      None
    }
    other => other,
  };

  let mut folders: Vec<(&str, PathBuf)> = Vec::new();
  match object.get(TARGET_FOLDERS) {
    None => violations.push(Violation::new(TARGET_FOLDERS, "required field is missing")),
    Some(Value::Object(entries)) => {
      if entries.is_empty() {
        violations.push(Violation::new(TARGET_FOLDERS, "must have at least one entry"));
      }
      let mut seen: BTreeMap<PathBuf, &str> = BTreeMap::new();
      for (input, folder) in entries {
        let field = format!("{TARGET_FOLDERS}.{input}");
        if input.is_empty() {
          violations.push(Violation::new(&field, "input file path must not be empty"));
        } else {
          check_relative_path(&field, input, &mut violations);
        }
        match folder.as_str() {
          Some("") => violations.push(Violation::new(&field, "must not be empty")),
          Some(folder) => {
            check_relative_path(&field, folder, &mut violations);
            let normalized = normalize(Path::new(folder));
            if let Some(other) = seen.insert(normalized.clone(), input.as_str()) {
              violations.push(Violation::new(
                &field,
                format!("target folder {folder} is already used by {other}"),
              ));
            } else {
              folders.push((input.as_str(), normalized));
            }
          }
          None => violations.push(Violation::new(
            &field,
            format!("expected a string, found {}", kind(folder)),
          )),
        }
      }
    }
    Some(other) => violations.push(Violation::new(
      TARGET_FOLDERS,
      format!("expected an object, found {}", kind(other)),
    )),
  }

  let mut links: Vec<(String, PathBuf)> = Vec::new();
  match object.get(SYMLINKS) {
    None => violations.push(Violation::new(SYMLINKS, "required field is missing")),
    Some(Value::Array(entries)) => {
      for (index, link) in entries.iter().enumerate() {
        let field = format!("{SYMLINKS}[{index}]");
        match link.as_str() {
          Some("") => violations.push(Violation::new(&field, "must not be empty")),
          Some(link) => {
            check_relative_path(&field, link, &mut violations);
            links.push((field, normalize(Path::new(link))));
          }
          None => violations.push(Violation::new(
            &field,
            format!("expected a string, found {}", kind(link)),
          )),
        }
      }
    }
    Some(other) => violations.push(Violation::new(
      SYMLINKS,
      format!("expected an array, found {}", kind(other)),
    )),
  }

  if let Some(name) = output_name {
    check_overlaps(name, &folders, &links, &mut violations);
  }

  violations
}

/// Every generated file and every link must land on its own path, across all
/// target folders. A link on a generated file would replace that file.
fn check_overlaps(
  output_name: &str,
  folders: &[(&str, PathBuf)],
  links: &[(String, PathBuf)],
  violations: &mut Vec<Violation>,
) {
  let generated: BTreeMap<PathBuf, &str> = folders
    .iter()
    .map(|(input, folder)| (folder.join(output_name), *input))
    .collect();
  let mut planned: BTreeMap<PathBuf, &str> = BTreeMap::new();

  for (input, folder) in folders {
    for (field, link) in links {
      let path = folder.join(link);
      if let Some(owner) = generated.get(&path) {
        violations.push(Violation::new(
          field,
          format!(
            "link {} would replace the file generated from {owner}",
            path.display()
          ),
        ));
      } else if let Some(other) = planned.insert(path.clone(), *input) {
        violations.push(Violation::new(
          field,
          format!(
            "link {} is planned for both {other} and {input}",
            path.display()
          ),
        ));
      }
    }
  }
}

fn required_string<'v>(
  object: &'v Map<String, Value>,
  field: &str,
  violations: &mut Vec<Violation>,
) -> Option<&'v str> {
  match object.get(field) {
    None => {
      violations.push(Violation::new(field, "required field is missing"));
      None
    }
    Some(Value::String(s)) if s.is_empty() => {
      violations.push(Violation::new(field, "must not be empty"));
      None
    }
    Some(Value::String(s)) => Some(s.as_str()),
    Some(other) => {
      violations.push(Violation::new(
        field,
        format!("expected a string, found {}", kind(other)),
      ));
      None
    }
  }
}

/// Paths must stay inside the base directory: relative, without `..`.
fn check_relative_path(field: &str, value: &str, violations: &mut Vec<Violation>) {
  let path = Path::new(value);
  let rooted = value.starts_with(['/', '\\'])
    || path
      .components()
      .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir));

  if rooted {
    violations.push(Violation::new(
      field,
      format!("path must be relative to the base directory: {value}"),
    ));
  } else if path.components().any(|c| c == Component::ParentDir) {
    violations.push(Violation::new(
      field,
      format!("path must not contain '..': {value}"),
    ));
  }
}

fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

fn list_violations(violations: &[Violation]) -> String {
  violations
    .iter()
    .map(|v| format!("  - {v}"))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Errors that can occur while loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// The config file could not be read
  #[error("Failed to read config file {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },
  /// The config file is not valid JSON, or does not deserialize
  #[error("Invalid JSON in config file {}: {source}\nContents:\n{contents}", .path.display())]
  Json {
    path: PathBuf,
    contents: String,
    source: serde_json::Error,
  },
  /// The config file does not match the schema
  #[error(
    "Invalid config file {}:\n{}\nContents:\n{contents}",
    .path.display(),
    list_violations(.violations)
  )]
  Schema {
    path: PathBuf,
    contents: String,
    violations: Vec<Violation>,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  const VALID: &str = r#"{
    "template": "env/.env.template",
    "outputFileName": ".env.local",
    "targetFolders": { "env/wt1.env": "wt1", "env/wt2.env": "wt2" },
    "symlinks": ["apps/web/.env.local", "apps/api/.env"]
  }"#;

  fn schema_violations(json: &str) -> Vec<Violation> {
    match Config::from_json("config.json", json).unwrap_err() {
      ConfigError::Schema { violations, .. } => violations,
      other => panic!("Expected Schema error, got {other:?}"),
    }
  }

  #[test]
  fn test_parse_valid_config() {
    let config = Config::from_json("config.json", VALID).unwrap();

    assert_eq!(config.template, "env/.env.template");
    assert_eq!(config.output_file_name, ".env.local");
    assert_eq!(
      config.target_folders.keys().collect::<Vec<_>>(),
      vec!["env/wt1.env", "env/wt2.env"]
    );
    assert_eq!(config.symlinks, vec!["apps/web/.env.local", "apps/api/.env"]);
    assert_eq!(config.output_path("wt1"), PathBuf::from("wt1/.env.local"));
  }

  #[test]
  fn test_empty_symlinks_are_allowed() {
    let json = r#"{"template":"t","outputFileName":"o","targetFolders":{"a":"b"},"symlinks":[]}"#;

    assert!(Config::from_json("config.json", json).unwrap().symlinks.is_empty());
  }

  #[test]
  fn test_missing_fields_are_all_reported() {
    let violations = schema_violations("{}");

    let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, vec![TEMPLATE, OUTPUT_FILE_NAME, TARGET_FOLDERS, SYMLINKS]);
    assert!(violations.iter().all(|v| v.message == "required field is missing"));
  }

  #[test]
  fn test_wrong_types() {
    let json = r#"{"template":1,"outputFileName":"o","targetFolders":{"a":true},"symlinks":"x"}"#;

    assert_eq!(
      schema_violations(json),
      vec![
        Violation::new(TEMPLATE, "expected a string, found a number"),
        Violation::new("targetFolders.a", "expected a string, found a boolean"),
        Violation::new(SYMLINKS, "expected an array, found a string"),
      ]
    );
  }

  #[test]
  fn test_empty_target_folders() {
    let json = r#"{"template":"t","outputFileName":"o","targetFolders":{},"symlinks":[]}"#;

    assert_eq!(
      schema_violations(json),
      vec![Violation::new(TARGET_FOLDERS, "must have at least one entry")]
    );
  }

  #[test]
  fn test_path_conventions() {
    let json = r#"{
      "template": "/etc/env.template",
      "outputFileName": "nested/.env",
      "targetFolders": { "../outside.env": "wt1" },
      "symlinks": ["apps/../../escape"]
    }"#;

    let fields: Vec<_> = schema_violations(json).into_iter().map(|v| v.field).collect();

    assert_eq!(
      fields,
      vec![
        TEMPLATE.to_string(),
        OUTPUT_FILE_NAME.to_string(),
        "targetFolders.../outside.env".to_string(),
        "symlinks[0]".to_string(),
      ]
    );
  }

  #[test]
  fn test_duplicate_target_folder() {
    let json = r#"{"template":"t","outputFileName":"o","targetFolders":{"a.env":"wt","b.env":"wt"},"symlinks":[]}"#;

    assert_eq!(
      schema_violations(json),
      vec![Violation::new(
        "targetFolders.b.env",
        "target folder wt is already used by a.env"
      )]
    );
  }

  #[test]
  fn test_duplicate_target_folder_after_normalizing() {
    let json = r#"{"template":"t","outputFileName":".env","targetFolders":{"a.env":"wt","b.env":"./wt/"},"symlinks":[]}"#;

    assert_eq!(
      schema_violations(json),
      vec![Violation::new(
        "targetFolders.b.env",
        "target folder ./wt/ is already used by a.env"
      )]
    );
  }

  #[test]
  fn test_link_onto_own_generated_file() {
    let json = r#"{"template":"t","outputFileName":".env.local","targetFolders":{"a.env":"wt1"},"symlinks":["./.env.local"]}"#;

    assert_eq!(
      schema_violations(json),
      vec![Violation::new(
        "symlinks[0]",
        format!(
          "link {} would replace the file generated from a.env",
          Path::new("wt1").join(".env.local").display()
        )
      )]
    );
  }

  #[test]
  fn test_link_onto_nested_folder_generated_file() {
    let json = r#"{
      "template": "t",
      "outputFileName": ".env",
      "targetFolders": { "a.env": "wt", "b.env": "wt/apps/web" },
      "symlinks": ["apps/web/.env"]
    }"#;

    assert_eq!(
      schema_violations(json),
      vec![Violation::new(
        "symlinks[0]",
        format!(
          "link {} would replace the file generated from b.env",
          Path::new("wt/apps/web/.env").display()
        )
      )]
    );
  }

  #[test]
  fn test_link_planned_by_two_folders() {
    let json = r#"{
      "template": "t",
      "outputFileName": ".env",
      "targetFolders": { "a.env": "wt", "b.env": "wt/apps" },
      "symlinks": ["apps/web/.env", "web/.env"]
    }"#;

    let violations = schema_violations(json);

    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].field, "symlinks[1]");
    assert!(violations[0].message.contains("is planned for both a.env and b.env"));
  }

  #[test]
  fn test_nested_folders_without_overlap_are_fine() {
    let json = r#"{
      "template": "t",
      "outputFileName": ".env.local",
      "targetFolders": { "a.env": "wt", "b.env": "wt/apps/web" },
      "symlinks": ["packages/db/.env.local"]
    }"#;

    assert!(Config::from_json("config.json", json).is_ok());
  }

  #[test]
  fn test_unknown_field() {
    let json = r#"{"template":"t","outputFileName":"o","targetFolders":{"a":"b"},"symlinks":[],"softLinks":[]}"#;

    assert_eq!(
      schema_violations(json),
      vec![Violation::new("softLinks", "unknown field")]
    );
  }

  #[test]
  fn test_root_must_be_object() {
    assert_eq!(
      schema_violations("[]"),
      vec![Violation::new("(root)", "expected an object")]
    );
  }

  #[test]
  fn test_invalid_json_keeps_contents() {
    let err = Config::from_json("config.json", "{ not json").unwrap_err();

    assert!(matches!(err, ConfigError::Json { .. }));
    let message = err.to_string();
    assert!(message.contains("config.json"));
    assert!(message.contains("{ not json"));
  }

  #[test]
  fn test_schema_error_message() {
    let json = r#"{"outputFileName":"o","targetFolders":{"a":"b"},"symlinks":[]}"#;
    let err = Config::from_json("conf/worktree-env.json", json).unwrap_err();

    assert_eq!(
      err.to_string(),
      format!(
        "Invalid config file conf/worktree-env.json:\n  - template: required field is missing\nContents:\n{json}"
      )
    );
  }

  #[test]
  fn test_load_missing_file() {
    let err = Config::load("definitely/not/here.json").unwrap_err();

    assert!(matches!(err, ConfigError::Read { .. }));
  }
}
