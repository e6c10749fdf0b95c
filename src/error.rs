//! Error types for docstruct operations.

use thiserror::Error;

use crate::model::NodeId;
use crate::prefs::Cardinality;

/// Errors that can occur while loading rulesets, building structures, or
/// reading documents.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid preferences: {0}")]
    Preferences(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Structure type '{child}' is not allowed as a child of '{parent}'")]
    TypeNotAllowed { parent: String, child: String },

    #[error("Metadata type '{metadata}' is not allowed for structure type '{doc_struct}'")]
    MetadataTypeNotAllowed { doc_struct: String, metadata: String },

    #[error(
        "Metadata type '{metadata}' on '{doc_struct}' allows {cardinality} value(s), {count} already present"
    )]
    CardinalityExceeded {
        doc_struct: String,
        metadata: String,
        cardinality: Cardinality,
        count: usize,
    },

    #[error("Value '{value}' does not match the validation expression of '{metadata}'")]
    InvalidValue { metadata: String, value: String },

    #[error("Node {child} cannot become a child of its own descendant {parent}")]
    CyclicStructure { parent: NodeId, child: NodeId },

    #[error("Structure node has no type")]
    NodeHasNoType,

    #[error("Incomplete {0}: no metadata type set")]
    IncompleteValue(&'static str),

    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Unknown content file '{0}'")]
    UnknownContentFile(String),

    #[error("Unknown technical metadata record '{0}'")]
    UnknownTechMd(String),
}

impl Error {
    /// True for errors caused by bad input rather than by a rejected graph
    /// operation.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Xml(_) | Error::Preferences(_) | Error::InvalidDocument(_)
        )
    }

    /// True for schema violations: the registry forbids the attempted attach.
    pub fn is_schema_violation(&self) -> bool {
        matches!(
            self,
            Error::TypeNotAllowed { .. }
                | Error::MetadataTypeNotAllowed { .. }
                | Error::CardinalityExceeded { .. }
                | Error::InvalidValue { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
