//! Nested field paths addressing one field of an activity, e.g.
//! `fields.2.type` or `fields.0.options.default`.

use std::{fmt, str::FromStr};

use crate::{Error, Result};

/// The part of a field a path addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLeaf {
  Name,
  Description,
  Type,
  PrimaryKey,
  Code,
  Details,
  Options,
  OptionsMultiple,
  OptionsAuto,
  OptionsDefault,
  OptionsReference,
}

impl FieldLeaf {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Name => "name",
      Self::Description => "description",
      Self::Type => "type",
      Self::PrimaryKey => "primary_key",
      Self::Code => "code",
      Self::Details => "details",
      Self::Options => "options",
      Self::OptionsMultiple => "options.multiple",
      Self::OptionsAuto => "options.auto",
      Self::OptionsDefault => "options.default",
      Self::OptionsReference => "options.reference",
    }
  }
}

impl FromStr for FieldLeaf {
  type Err = ();

  fn from_str(s: &str) -> Result<Self, ()> {
    Ok(match s {
      "name" => Self::Name,
      "description" => Self::Description,
      "type" => Self::Type,
      "primary_key" => Self::PrimaryKey,
      "code" => Self::Code,
      "details" => Self::Details,
      "options" => Self::Options,
      "options.multiple" => Self::OptionsMultiple,
      "options.auto" => Self::OptionsAuto,
      "options.default" => Self::OptionsDefault,
      "options.reference" => Self::OptionsReference,
      _ => return Err(()),
    })
  }
}

/// A parsed `fields.<position>[.<leaf>]` path. Without a leaf the path
/// addresses the whole field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath {
  pub position: usize,
  pub leaf:     Option<FieldLeaf>,
}

impl FieldPath {
  pub fn parse(raw: &str) -> Result<Self> {
    let invalid = || Error::InvalidFieldPath(raw.to_owned());

    let rest = raw.strip_prefix("fields.").ok_or_else(invalid)?;
    let (position, leaf) = match rest.split_once('.') {
      Some((position, leaf)) => (position, Some(leaf)),
      None => (rest, None),
    };

    // Reject signs and whitespace that `usize::from_str` would not, but
    // which would make the path ambiguous as a document key.
    if position.is_empty() || !position.bytes().all(|b| b.is_ascii_digit()) {
      return Err(invalid());
    }
    let position = position.parse().map_err(|_| invalid())?;
    let leaf = leaf
      .map(|l| l.parse::<FieldLeaf>().map_err(|_| invalid()))
      .transpose()?;

    Ok(Self { position, leaf })
  }

  /// Whether a write to this path can change a field's relationships.
  pub fn touches_relationships(&self) -> bool {
    matches!(self.leaf, None | Some(FieldLeaf::Type | FieldLeaf::Details))
  }
}

impl fmt::Display for FieldPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "fields.{}", self.position)?;
    if let Some(leaf) = self.leaf {
      write!(f, ".{}", leaf.as_str())?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_leaf_and_whole_field_paths() {
    assert_eq!(
      FieldPath::parse("fields.2.type").unwrap(),
      FieldPath { position: 2, leaf: Some(FieldLeaf::Type) }
    );
    assert_eq!(
      FieldPath::parse("fields.0.options.default").unwrap(),
      FieldPath { position: 0, leaf: Some(FieldLeaf::OptionsDefault) }
    );
    assert_eq!(
      FieldPath::parse("fields.11").unwrap(),
      FieldPath { position: 11, leaf: None }
    );
  }

  #[test]
  fn rejects_malformed_paths() {
    for raw in [
      "",
      "fields",
      "fields.",
      "fields.x.type",
      "fields.-1.type",
      "fields.+1.type",
      "fields.1.colour",
      "fields.1.options.colour",
      "relationships.0",
      "fields.1.",
    ] {
      assert!(
        matches!(FieldPath::parse(raw), Err(Error::InvalidFieldPath(_))),
        "{raw:?} should be rejected"
      );
    }
  }

  #[test]
  fn only_type_details_and_whole_field_touch_relationships() {
    let touches =
      |raw: &str| FieldPath::parse(raw).unwrap().touches_relationships();
    assert!(touches("fields.0.type"));
    assert!(touches("fields.0.details"));
    assert!(touches("fields.0"));
    assert!(!touches("fields.0.name"));
    assert!(!touches("fields.0.options.multiple"));
  }

  #[test]
  fn display_round_trips() {
    for raw in ["fields.3", "fields.3.code", "fields.0.options.reference"] {
      assert_eq!(FieldPath::parse(raw).unwrap().to_string(), raw);
    }
  }
}
