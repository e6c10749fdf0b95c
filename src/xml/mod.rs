//! Structure XML: a native serialization of [`DigitalDocument`].
//!
//! ```xml
//! <DigitalDocument>
//!   <FileSet><File id="f1" location="0001.tif" mimetype="image/tiff"/></FileSet>
//!   <AmdSec><Md id="AMD_1" type="techMD">...</Md></AmdSec>
//!   <Logical>
//!     <DocStruct id="0" type="Monograph">
//!       <Metadata type="TitleDocMain">Faust</Metadata>
//!       <Person type="Author" firstName="Johann" lastName="Goethe"/>
//!       <DocStruct id="1" type="Chapter"/>
//!     </DocStruct>
//!   </Logical>
//!   <Physical>
//!     <DocStruct id="2" type="BoundBook">
//!       <DocStruct id="3" type="Page"><FileRef file="f1"/></DocStruct>
//!     </DocStruct>
//!   </Physical>
//!   <Links><Link from="1" to="3" type="logical_physical"/></Links>
//! </DigitalDocument>
//! ```

mod reader;
mod writer;

use std::path::Path;

pub use reader::read;
pub use writer::write;

use crate::error::Result;
use crate::model::DigitalDocument;
use crate::prefs::Prefs;
use crate::util::{decode_text, declared_encoding};

/// Parse structure XML from raw bytes, detecting the text encoding.
pub fn read_bytes(bytes: &[u8], prefs: &Prefs) -> Result<DigitalDocument> {
    let text = decode_text(bytes, declared_encoding(bytes));
    read(&text, prefs)
}

/// Read a structure XML file.
pub fn read_file<P: AsRef<Path>>(path: P, prefs: &Prefs) -> Result<DigitalDocument> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "reading document");
    read_bytes(&bytes, prefs)
}

/// Write a document to a structure XML file.
pub fn write_file<P: AsRef<Path>>(doc: &DigitalDocument, path: P) -> Result<()> {
    std::fs::write(path, write(doc))?;
    Ok(())
}
