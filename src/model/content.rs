//! Content files (page images, full texts) and node references into them.

use std::fmt;
use std::str::FromStr;

/// A file belonging to the digitized work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFile {
    pub id: String,
    pub location: String,
    pub mime_type: String,
}

impl ContentFile {
    pub fn new(
        id: impl Into<String>,
        location: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// How the bounds of a [`ContentFileArea`] are expressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AreaKind {
    Coordinates,
    ByteOffset,
    Timecode,
    Other(String),
}

impl AreaKind {
    pub fn as_str(&self) -> &str {
        match self {
            AreaKind::Coordinates => "coordinates",
            AreaKind::ByteOffset => "byteoffset",
            AreaKind::Timecode => "timecode",
            AreaKind::Other(s) => s,
        }
    }
}

impl fmt::Display for AreaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AreaKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "coordinates" => AreaKind::Coordinates,
            "byteoffset" => AreaKind::ByteOffset,
            "timecode" => AreaKind::Timecode,
            other => AreaKind::Other(other.to_string()),
        })
    }
}

/// A region within a content file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFileArea {
    pub kind: AreaKind,
    pub begin: String,
    pub end: String,
}

impl ContentFileArea {
    pub fn new(kind: AreaKind, begin: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            kind,
            begin: begin.into(),
            end: end.into(),
        }
    }
}

/// A node's link to a content file, optionally narrowed to an area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFileReference {
    /// Id of a file in the document's [`FileSet`].
    pub file: String,
    pub area: Option<ContentFileArea>,
}

/// The canonical list of content files of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<ContentFile>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. Returns `false` if a file with that id exists.
    pub fn add_file(&mut self, file: ContentFile) -> bool {
        if self.get(&file.id).is_some() {
            return false;
        }
        self.files.push(file);
        true
    }

    /// Remove a file from the set only. Use
    /// [`DigitalDocument::remove_content_file`](super::DigitalDocument::remove_content_file)
    /// to also drop node references to it.
    pub(crate) fn remove_file(&mut self, id: &str) -> Option<ContentFile> {
        let i = self.files.iter().position(|f| f.id == id)?;
        Some(self.files.remove(i))
    }

    pub fn get(&self, id: &str) -> Option<&ContentFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn files(&self) -> &[ContentFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_kind_round_trip() {
        for s in ["coordinates", "byteoffset", "timecode", "smil"] {
            let kind: AreaKind = s.parse().unwrap();
            assert_eq!(kind.as_str(), s);
        }
        assert_eq!("smil".parse::<AreaKind>().unwrap(), AreaKind::Other("smil".into()));
    }

    #[test]
    fn test_file_set() {
        let mut set = FileSet::new();
        assert!(set.add_file(ContentFile::new("f1", "images/0001.tif", "image/tiff")));
        assert!(!set.add_file(ContentFile::new("f1", "images/other.tif", "image/tiff")));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("f1").unwrap().location, "images/0001.tif");
        assert!(set.remove_file("f1").is_some());
        assert!(set.is_empty());
    }
}
