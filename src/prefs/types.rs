//! Metadata and metadata-group type definitions.

use std::collections::BTreeMap;

use regex::Regex;

use super::Cardinality;
use crate::error::{Error, Result};

/// Type names starting with this prefix are internal: they may be attached
/// to any node without being registered on its structure type.
pub const INTERNAL_PREFIX: &str = "_";

/// Display names keyed by language code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translations(BTreeMap<String, String>);

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display name for a language, replacing any previous one.
    pub fn set(&mut self, language: impl Into<String>, name: impl Into<String>) {
        self.0.insert(language.into(), name.into());
    }

    pub fn get(&self, language: &str) -> Option<&str> {
        self.0.get(language).map(String::as_str)
    }

    pub fn remove(&mut self, language: &str) -> Option<String> {
        self.0.remove(language)
    }

    /// Iterate `(language, name)` pairs in language order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A kind of metadata value (title, author, identifier, ...).
///
/// Equality looks only at `name`, `is_person` and
/// `is_identifier`: the copies a structure type keeps of a shared type
/// compare equal to the original even after either has been edited.
#[derive(Debug, Clone, Default)]
pub struct MetadataType {
    pub name: String,
    pub is_person: bool,
    pub is_corporate: bool,
    pub is_identifier: bool,
    pub allow_name_parts: bool,
    /// Values may carry an authority-file triple.
    pub allow_authority: bool,
    /// The type's own cardinality, used when a structure type references it
    /// without an explicit `num`.
    pub num: Cardinality,
    pub names: Translations,
    validation: Option<Regex>,
}

impl MetadataType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn person(name: impl Into<String>) -> Self {
        Self {
            is_person: true,
            ..Self::new(name)
        }
    }

    pub fn corporate(name: impl Into<String>) -> Self {
        Self {
            is_corporate: true,
            ..Self::new(name)
        }
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self {
            is_identifier: true,
            ..Self::new(name)
        }
    }

    pub fn with_num(mut self, num: Cardinality) -> Self {
        self.num = num;
        self
    }

    pub fn with_name(mut self, language: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.set(language, name);
        self
    }

    /// Set the cardinality from a ruleset code.
    ///
    /// Unrecognized codes are rejected and the current value is kept.
    pub fn set_num(&mut self, code: &str) -> bool {
        match Cardinality::from_code(code) {
            Some(num) => {
                self.num = num;
                true
            }
            None => false,
        }
    }

    /// Whether this is an internal (unregistered) type.
    pub fn is_internal(&self) -> bool {
        self.name.starts_with(INTERNAL_PREFIX)
    }

    /// Display name for `language`, falling back to the bare type name.
    pub fn display_name(&self, language: &str) -> &str {
        self.names.get(language).unwrap_or(&self.name)
    }

    pub fn validation_expression(&self) -> Option<&str> {
        self.validation.as_ref().map(Regex::as_str)
    }

    pub fn set_validation_expression(&mut self, expression: &str) -> Result<()> {
        let regex = Regex::new(expression).map_err(|e| {
            Error::Preferences(format!(
                "invalid validation expression for '{}': {e}",
                self.name
            ))
        })?;
        self.validation = Some(regex);
        Ok(())
    }

    pub fn clear_validation_expression(&mut self) {
        self.validation = None;
    }

    /// Check a value against the validation expression, if any.
    pub fn accepts_value(&self, value: &str) -> bool {
        self.validation.as_ref().is_none_or(|re| re.is_match(value))
    }
}

impl PartialEq for MetadataType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.is_person == other.is_person
            && self.is_identifier == other.is_identifier
    }
}

impl Eq for MetadataType {}

/// A metadata type registered on an owner, with the cardinality the owner
/// imposes on it.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRule {
    /// The owner's private copy of the type.
    pub md_type: MetadataType,
    pub cardinality: Cardinality,
    /// Shown by default in editors.
    pub default_display: bool,
}

impl MetadataRule {
    /// Set the cardinality from a ruleset code, keeping the current one if
    /// the code is not recognized.
    pub fn set_cardinality(&mut self, code: &str) -> bool {
        match Cardinality::from_code(code) {
            Some(c) => {
                self.cardinality = c;
                true
            }
            None => false,
        }
    }
}

/// A named bundle of metadata types attached and counted as one unit.
#[derive(Debug, Clone, Default)]
pub struct MetadataGroupType {
    pub name: String,
    pub num: Cardinality,
    pub names: Translations,
    members: Vec<MetadataRule>,
}

impl MetadataGroupType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Register a member type. The type is copied; later edits to
    /// `md_type` do not affect the group.
    ///
    /// Returns `false` if a member of that name is already registered.
    pub fn add_metadata_type(&mut self, md_type: &MetadataType, cardinality: Cardinality) -> bool {
        if self.member(&md_type.name).is_some() {
            return false;
        }
        self.members.push(MetadataRule {
            md_type: md_type.clone(),
            cardinality,
            default_display: false,
        });
        true
    }

    pub fn remove_metadata_type(&mut self, name: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|r| r.md_type.name != name);
        self.members.len() != before
    }

    pub fn member(&self, name: &str) -> Option<&MetadataRule> {
        self.members.iter().find(|r| r.md_type.name == name)
    }

    pub fn members(&self) -> &[MetadataRule] {
        &self.members
    }

    pub fn display_name(&self, language: &str) -> &str {
        self.names.get(language).unwrap_or(&self.name)
    }
}

impl PartialEq for MetadataGroupType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for MetadataGroupType {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_coarse() {
        let a = MetadataType::new("TitleDocMain").with_name("en", "Title");
        let mut b = a.clone();
        b.names.set("en", "Main title");
        b.allow_authority = true;
        b.num = Cardinality::ZeroOrMore;
        assert_eq!(a, b);

        let person = MetadataType::person("TitleDocMain");
        assert_ne!(a, person);
    }

    #[test]
    fn test_set_num_keeps_previous_on_garbage() {
        let mut t = MetadataType::new("Author").with_num(Cardinality::OneOrMore);
        assert!(!t.set_num("many"));
        assert_eq!(t.num, Cardinality::OneOrMore);
        assert!(t.set_num("1m"));
        assert_eq!(t.num, Cardinality::ExactlyOne);
    }

    #[test]
    fn test_display_name_fallback() {
        let t = MetadataType::new("PlaceOfPublication").with_name("de", "Erscheinungsort");
        assert_eq!(t.display_name("de"), "Erscheinungsort");
        assert_eq!(t.display_name("fr"), "PlaceOfPublication");
    }

    #[test]
    fn test_internal_prefix() {
        assert!(MetadataType::new("_urn").is_internal());
        assert!(!MetadataType::new("urn").is_internal());
    }

    #[test]
    fn test_validation_expression() {
        let mut t = MetadataType::new("CurrentNoSorting");
        assert!(t.accepts_value("anything"));
        t.set_validation_expression(r"^\d+$").unwrap();
        assert!(t.accepts_value("42"));
        assert!(!t.accepts_value("4a"));
        assert_eq!(t.validation_expression(), Some(r"^\d+$"));
        assert!(t.set_validation_expression("(").is_err());
        // A failed update leaves the previous expression in place.
        assert_eq!(t.validation_expression(), Some(r"^\d+$"));
    }

    #[test]
    fn test_group_members_are_copies() {
        let mut title = MetadataType::new("SeriesTitle");
        let mut group = MetadataGroupType::new("Series");
        assert!(group.add_metadata_type(&title, Cardinality::ExactlyOne));
        assert!(!group.add_metadata_type(&title, Cardinality::ZeroOrMore));

        title.names.set("en", "Renamed");
        let member = group.member("SeriesTitle").unwrap();
        assert!(member.md_type.names.is_empty());
        assert_eq!(member.cardinality, Cardinality::ExactlyOne);

        assert!(group.remove_metadata_type("SeriesTitle"));
        assert!(group.members().is_empty());
    }
}
