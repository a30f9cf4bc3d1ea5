//! Pure generation of env files from a config and already-read sources.
//!
//! # Generation Logic
//!
//! 1. Parses the template and every input file named in `targetFolders`
//! 2. Requires all input files to define the same keys
//! 3. For each input file:
//!    - Substitutes its values into the raw template text
//!    - Renders the input variables, then the resolved template variables
//! 4. Returns one [`GeneratedFile`] per target folder
//!
//! Any failure returns an error and no files at all. Nothing here touches the
//! filesystem.

use std::collections::BTreeMap;
use std::path::PathBuf;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::config::Config;
use crate::interpolate::{InterpolateError, interpolate};
use crate::parse::EnvMapping;
use crate::serialize::render_sections;
use crate::validate::{ValidationError, Warning, check_key_sets, unused_variables};

/// Raw file contents keyed by the path used in the config.
pub type FileContents = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
  /// Input file the values came from, as written in the config
  pub source: String,
  /// `targetFolder/outputFileName`
  pub path: PathBuf,
  pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Generation {
  pub files: Vec<GeneratedFile>,
  pub warnings: Vec<Warning>,
}

pub struct Generator;

impl Generator {
  /// Builds every generated file, or fails without producing any.
  ///
  /// `${NAME}` references are replaced in the raw template text, and only the
  /// result is parsed. A value is therefore not confined to the value position:
  /// one that starts a line with `#` comments that line out, and one placed in
  /// key position renames the variable.
  pub fn generate(config: &Config, contents: &FileContents) -> Result<Generation, GenerateError> {
    #[cfg(feature = "tracing")]
    info!(template = %config.template, targets = config.target_folders.len(), "Generating env files");

    let template_text = contents
      .get(&config.template)
      .ok_or_else(|| GenerateError::TemplateNotFound(config.template.clone()))?;

    #[cfg(feature = "tracing")]
    debug!(
      "Template defines {} variables",
      EnvMapping::from(template_text.as_str()).len()
    );

    let inputs = config
      .target_folders
      .iter()
      .map(|(input, folder)| {
        contents
          .get(input)
          .map(|text| (input.as_str(), folder.as_str(), EnvMapping::from(text.as_str())))
          .ok_or_else(|| GenerateError::InputNotFound(input.clone()))
      })
      .collect::<Result<Vec<_>, _>>()?;

    let key_sets: Vec<(&str, &EnvMapping)> = inputs.iter().map(|(input, _, env)| (*input, env)).collect();
    check_key_sets(&key_sets)?;

    let mut generation = Generation::default();

    for (input, folder, env) in &inputs {
      let resolved = interpolate(template_text, env).map_err(|source| GenerateError::Interpolate {
        input: input.to_string(),
        source,
      })?;
      let template_vars = EnvMapping::from(resolved.as_str());

      let path = config.output_path(folder);

      #[cfg(feature = "tracing")]
      debug!(?path, "Rendered {} input and {} template variables", env.len(), template_vars.len());

      generation.files.push(GeneratedFile {
        source: input.to_string(),
        path,
        content: render_sections(env, &template_vars),
      });

      generation
        .warnings
        .extend(unused_variables(input, env, template_text));
    }

    #[cfg(feature = "tracing")]
    for warning in &generation.warnings {
      debug!("{}", warning);
    }

    Ok(generation)
  }
}

/// Errors that stop generation before any file is produced.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
  /// The template path from the config has no contents
  #[error("Template file not found: {0}")]
  TemplateNotFound(String),
  /// An input path from `targetFolders` has no contents
  #[error("Input file not found: {0}")]
  InputNotFound(String),
  /// The input files disagree with each other
  #[error(transparent)]
  Validation(#[from] ValidationError),
  /// The template references a variable the input file does not define
  #[error("{input}: {source}")]
  Interpolate {
    input: String,
    source: InterpolateError,
  },
}
