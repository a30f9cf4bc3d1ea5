//! Canonical rendering of env mappings.
//!
//! Every variable is written as `KEY="value"`, one per line, sorted by key in
//! byte order. Inside the quotes a backslash becomes `\\` and a double quote
//! becomes `\"`; nothing else is escaped. The output only depends on the keys
//! and values of the mapping, never on the order they were inserted in.

use std::borrow::Cow;

use crate::parse::{EnvMapping, EnvVariable};

pub const INPUT_HEADER: &str = "# Input variables";
pub const TEMPLATE_HEADER: &str = "# Template variables";

/// Escapes a raw value for use between double quotes.
pub fn escape(value: &str) -> String {
  value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Reverses [`escape`].
pub fn unescape(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  let mut chars = value.chars();

  while let Some(c) = chars.next() {
    if c == '\\' {
      match chars.next() {
        Some(next @ ('\\' | '"')) => out.push(next),
        Some(other) => {
          out.push('\\');
          out.push(other);
        }
        None => out.push('\\'),
      }
    } else {
      out.push(c);
    }
  }

  out
}

/// Renders a mapping as sorted `KEY="value"` lines joined by `\n`, without a
/// trailing newline.
pub fn serialize(mapping: &EnvMapping) -> String {
  let mut vars: Vec<&EnvVariable> = mapping.iter().collect();
  vars.sort_by(|a, b| a.key.as_bytes().cmp(b.key.as_bytes()));

  vars
    .iter()
    .map(|var| format!("{}=\"{}\"", var.key, escape(&var.value)))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Renders the generated file: the input block, a blank line, then the template block.
pub fn render_sections(input: &EnvMapping, template: &EnvMapping) -> String {
  let mut out = String::new();
  push_block(&mut out, INPUT_HEADER, input);
  out.push('\n');
  push_block(&mut out, TEMPLATE_HEADER, template);
  out
}

fn push_block(out: &mut String, header: &str, mapping: &EnvMapping) {
  out.push_str(header);
  out.push('\n');
  if !mapping.is_empty() {
    out.push_str(&serialize(mapping));
    out.push('\n');
  }
}

/// Reads serialized output back into owned values.
///
/// Each value loses one pair of surrounding double quotes and is unescaped.
/// Values that are not quoted are kept as they are.
pub fn decode(content: &str) -> EnvMapping<'static> {
  EnvMapping::from(content)
    .iter()
    .map(|var| {
      let value = match var
        .value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
      {
        Some(inner) => unescape(inner),
        None => var.value.to_string(),
      };
      (Cow::Owned(var.key.to_string()), Cow::Owned(value))
    })
    .collect::<EnvMapping<'static>>()
}
