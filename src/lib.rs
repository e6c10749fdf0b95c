//! # docstruct
//!
//! A schema-validated model of the logical and physical structure of a
//! digitized work: chapters and pages, their metadata, and the links between
//! logical sections and page scans.
//!
//! ## Features
//!
//! - Ruleset-driven type system: which structure types nest where, which
//!   metadata each may carry and how many values of it
//! - Structure graph with bidirectional cross-tree references
//! - Cycle-safe structural comparison and deep copies
//! - Validation reports for unlinked nodes and missing metadata
//! - A native structure XML codec
//!
//! ## Quick Start
//!
//! ```
//! use docstruct::{DigitalDocument, Metadata, Prefs};
//!
//! let prefs = Prefs::from_xml(r#"
//!     <Preferences>
//!       <MetadataType><Name>TitleDocMain</Name></MetadataType>
//!       <DocStrctType topStruct="true">
//!         <Name>Monograph</Name>
//!         <allowedchildtype>Chapter</allowedchildtype>
//!         <metadata num="1m">TitleDocMain</metadata>
//!       </DocStrctType>
//!       <DocStrctType><Name>Chapter</Name></DocStrctType>
//!     </Preferences>"#).unwrap();
//!
//! let mut doc = DigitalDocument::new();
//! let book = doc.create(prefs.doc_struct_type("Monograph").unwrap());
//! let chapter = doc.create(prefs.doc_struct_type("Chapter").unwrap());
//! doc.set_logical_root(book).unwrap();
//! doc.add_child(book, chapter).unwrap();
//!
//! let title = prefs.metadata_type("TitleDocMain").unwrap().clone();
//! doc.add_metadata(book, Metadata::new(title).with_value("Faust")).unwrap();
//!
//! let report = docstruct::validate(&doc);
//! assert!(!report.is_valid()); // the chapter is not linked to a page
//! ```

pub mod compare;
pub mod error;
pub mod model;
pub mod prefs;
pub(crate) mod util;
pub mod validate;
pub mod xml;

use std::path::Path;

pub use compare::{documents_equal, structurally_equal};
pub use error::{Error, Result};
pub use model::{
    AreaKind, Authority, ContentFile, ContentFileArea, ContentFileReference, Corporate,
    DigitalDocument, DocStruct, Endpoint, ExclusiveAccess, FileSet, Md, Metadata, MetadataGroup,
    NamePart, NodeId, Person, Reference, Value,
};
pub use prefs::{Cardinality, DocStructType, MetadataGroupType, MetadataType, Prefs};
pub use validate::{Diagnostic, ValidationReport, validate};

/// Read a structure XML document from a file.
pub fn read_document<P: AsRef<Path>>(path: P, prefs: &Prefs) -> Result<DigitalDocument> {
    xml::read_file(path, prefs)
}

/// Write a document to a structure XML file.
pub fn write_document<P: AsRef<Path>>(doc: &DigitalDocument, path: P) -> Result<()> {
    xml::write_file(doc, path)
}
