//! Typed values attached to structure nodes.

use crate::error::{Error, Result};
use crate::prefs::{MetadataGroupType, MetadataType};

/// An authority-file reference: a controlled-vocabulary entry identified by
/// id, URI and value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authority {
    pub id: Option<String>,
    pub uri: Option<String>,
    pub value: Option<String>,
}

impl Authority {
    pub fn new(
        id: impl Into<String>,
        uri: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            uri: Some(uri.into()),
            value: Some(value.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.uri.is_none() && self.value.is_none()
    }
}

/// A plain metadata value.
///
/// Equality ignores the `updated` bookkeeping flag.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub md_type: Option<MetadataType>,
    pub value: Option<String>,
    pub value_qualifier: Option<String>,
    pub value_qualifier_type: Option<String>,
    pub authority: Option<Authority>,
    pub access_restricted: bool,
    /// Set whenever the value changes after construction.
    pub updated: bool,
}

impl Metadata {
    pub fn new(md_type: MetadataType) -> Self {
        Self {
            md_type: Some(md_type),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_authority(mut self, authority: Authority) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn restricted(mut self) -> Self {
        self.access_restricted = true;
        self
    }

    pub fn type_name(&self) -> Option<&str> {
        self.md_type.as_ref().map(|t| t.name.as_str())
    }

    /// The value, or `""` if unset.
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
        self.updated = true;
    }
}

impl PartialEq for Metadata {
    fn eq(&self, other: &Self) -> bool {
        self.md_type == other.md_type
            && self.value == other.value
            && self.value_qualifier == other.value_qualifier
            && self.value_qualifier_type == other.value_qualifier_type
            && self.authority == other.authority
            && self.access_restricted == other.access_restricted
    }
}

/// One component of a structured name (`date`, `termsOfAddress`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePart {
    pub kind: String,
    pub value: String,
}

impl NamePart {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// A person attached in a role given by its metadata type (`Author`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub meta: Metadata,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub affiliation: Option<String>,
    pub institution: Option<String>,
    pub name_parts: Vec<NamePart>,
}

impl Person {
    pub fn new(md_type: MetadataType) -> Self {
        Self {
            meta: Metadata::new(md_type),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    /// The explicit display name, or `"Last, First"` built from the parts.
    pub fn display(&self) -> String {
        if let Some(name) = &self.display_name {
            return name.clone();
        }
        match (self.last_name.as_deref(), self.first_name.as_deref()) {
            (Some(last), Some(first)) => format!("{last}, {first}"),
            (Some(last), None) => last.to_string(),
            (None, Some(first)) => first.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// A corporate body (publisher, institution, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corporate {
    pub meta: Metadata,
    pub main_name: Option<String>,
    pub sub_names: Vec<NamePart>,
    pub part_name: Option<String>,
}

impl Corporate {
    pub fn new(md_type: MetadataType) -> Self {
        Self {
            meta: Metadata::new(md_type),
            ..Default::default()
        }
    }

    pub fn with_main_name(mut self, name: impl Into<String>) -> Self {
        self.main_name = Some(name.into());
        self
    }
}

/// Anything that can be attached to a structure node.
///
/// Variants never compare equal to each other, even with identical fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Plain(Metadata),
    Person(Person),
    Corporate(Corporate),
}

impl Value {
    /// The common metadata part.
    pub fn meta(&self) -> &Metadata {
        match self {
            Value::Plain(m) => m,
            Value::Person(p) => &p.meta,
            Value::Corporate(c) => &c.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut Metadata {
        match self {
            Value::Plain(m) => m,
            Value::Person(p) => &mut p.meta,
            Value::Corporate(c) => &mut c.meta,
        }
    }

    pub fn md_type(&self) -> Option<&MetadataType> {
        self.meta().md_type.as_ref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.meta().type_name()
    }

    /// Human-readable variant name.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Plain(_) => "metadata",
            Value::Person(_) => "person",
            Value::Corporate(_) => "corporate",
        }
    }

    pub fn as_plain(&self) -> Option<&Metadata> {
        match self {
            Value::Plain(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_person(&self) -> Option<&Person> {
        match self {
            Value::Person(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_corporate(&self) -> Option<&Corporate> {
        match self {
            Value::Corporate(c) => Some(c),
            _ => None,
        }
    }
}

impl From<Metadata> for Value {
    fn from(m: Metadata) -> Self {
        Value::Plain(m)
    }
}

impl From<Person> for Value {
    fn from(p: Person) -> Self {
        Value::Person(p)
    }
}

impl From<Corporate> for Value {
    fn from(c: Corporate) -> Self {
        Value::Corporate(c)
    }
}

/// A group of values attached and counted as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataGroup {
    pub group_type: Option<MetadataGroupType>,
    values: Vec<Value>,
}

impl MetadataGroup {
    pub fn new(group_type: MetadataGroupType) -> Self {
        Self {
            group_type: Some(group_type),
            values: Vec::new(),
        }
    }

    pub fn type_name(&self) -> Option<&str> {
        self.group_type.as_ref().map(|t| t.name.as_str())
    }

    /// Add a member value, checked against the group type's member rules.
    ///
    /// The value's type is replaced by the group type's own copy.
    pub fn add(&mut self, value: impl Into<Value>) -> Result<()> {
        let mut value = value.into();
        let group_type = self
            .group_type
            .as_ref()
            .ok_or(Error::IncompleteValue("metadata group"))?;
        let name = value
            .type_name()
            .ok_or(Error::IncompleteValue(value.kind()))?
            .to_string();
        let rule = group_type
            .member(&name)
            .ok_or_else(|| Error::MetadataTypeNotAllowed {
                doc_struct: group_type.name.clone(),
                metadata: name.clone(),
            })?;
        let count = self.count(&name);
        if !rule.cardinality.admits_another(count) {
            return Err(Error::CardinalityExceeded {
                doc_struct: group_type.name.clone(),
                metadata: name,
                cardinality: rule.cardinality,
                count,
            });
        }
        value.meta_mut().md_type = Some(rule.md_type.clone());
        self.values.push(value);
        Ok(())
    }

    /// Remove the first value equal to `value`.
    pub fn remove(&mut self, value: &Value) -> bool {
        match self.values.iter().position(|v| v == value) {
            Some(i) => {
                self.values.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn values_by_type<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Value> + use<'a, 'n> {
        self.values
            .iter()
            .filter(move |v| v.type_name() == Some(name))
    }

    pub fn count(&self, name: &str) -> usize {
        self.values_by_type(name).count()
    }
}
