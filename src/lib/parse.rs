use std::borrow::Cow;

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

const COMMENT_PREFIX: &str = "#";
const ASSIGNMENT_OPERATOR: char = '=';

/// Ordered `KEY=value` mapping read from one env file.
///
/// Keys keep the position of their first appearance. A key assigned again later
/// in the file keeps that position but takes the later value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvMapping<'a> {
  entries: Vec<EnvVariable<'a>>,
}

impl<'a> From<&'a str> for EnvMapping<'a> {
  fn from(s: &'a str) -> Self {
    #[cfg(feature = "tracing")]
    debug!("Parsing env file with {} lines", s.lines().count());

    let mut mapping = Self::default();

    for line in s.lines() {
      #[cfg(feature = "tracing")]
      trace!("Parsing line: {:?}", line);

      if let Some(var) = EnvVariable::from_line(line) {
        mapping.insert(var.key, var.value);
      }
    }

    #[cfg(feature = "tracing")]
    debug!("Parsed {} variables", mapping.len());

    mapping
  }
}

impl<'a, K, V> FromIterator<(K, V)> for EnvMapping<'a>
where
  K: Into<Cow<'a, str>>,
  V: Into<Cow<'a, str>>,
{
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut mapping = Self::default();
    for (key, value) in iter {
      mapping.insert(key.into(), value.into());
    }
    mapping
  }
}

impl<'a> EnvMapping<'a> {
  pub fn get(&self, key: &str) -> Option<&str> {
    self
      .entries
      .iter()
      .find(|var| var.key == key)
      .map(|var| var.value.as_ref())
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.entries.iter().any(|var| var.key == key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|var| var.key.as_ref())
  }

  pub fn iter(&self) -> impl Iterator<Item = &EnvVariable<'a>> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  fn insert(&mut self, key: Cow<'a, str>, value: Cow<'a, str>) {
    if let Some(existing) = self.entries.iter_mut().find(|var| var.key == key) {
      #[cfg(feature = "tracing")]
      trace!("Duplicate key {}, keeping the later value", key);

      existing.value = value;
    } else {
      self.entries.push(EnvVariable { key, value });
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVariable<'a> {
  pub key: Cow<'a, str>,
  pub value: Cow<'a, str>,
}

impl<'a> EnvVariable<'a> {
  /// Reads one line. Blank lines, comments, lines without `=` and lines with
  /// an empty key yield `None`.
  ///
  /// The key is trimmed, the value is kept exactly as written after the first `=`.
  pub fn from_line(line: &'a str) -> Option<Self> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
      return None;
    }

    let (key, value) = line.split_once(ASSIGNMENT_OPERATOR)?;
    let key = key.trim();
    if key.is_empty() {
      #[cfg(feature = "tracing")]
      trace!("Skipping assignment without a key: {:?}", line);
      return None;
    }

    Some(EnvVariable {
      key: Cow::Borrowed(key),
      value: Cow::Borrowed(value),
    })
  }
}
