//! Technical metadata records.

/// Prefix of generated record ids.
pub const TECH_MD_PREFIX: &str = "AMD_";

/// One technical metadata record, stored opaquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Md {
    /// Empty ids are replaced with a generated one on insertion.
    pub id: String,
    /// Record kind, e.g. `techMD` or `rightsMD`.
    pub kind: String,
    pub content: String,
}

impl Md {
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            kind: kind.into(),
            content: content.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// The administrative section holding all technical metadata of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmdSec {
    pub id: Option<String>,
    records: Vec<Md>,
    next_id: u64,
}

impl AmdSec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record and return its id.
    ///
    /// Ids are generated as `AMD_<n>` with `n` counting up from 1, skipping
    /// ids already in use. A record whose id already exists replaces it.
    pub fn insert(&mut self, mut md: Md) -> String {
        if md.id.is_empty() {
            md.id = self.generate_id();
        }
        let id = md.id.clone();
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(existing) => *existing = md,
            None => self.records.push(md),
        }
        id
    }

    fn generate_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = format!("{TECH_MD_PREFIX}{}", self.next_id);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Md> {
        self.records.iter().find(|r| r.id == id)
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Md> {
        let i = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(i))
    }

    pub fn records(&self) -> &[Md] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_deterministic() {
        let mut sec = AmdSec::new();
        assert_eq!(sec.insert(Md::new("techMD", "<a/>")), "AMD_1");
        assert_eq!(sec.insert(Md::new("techMD", "<b/>")), "AMD_2");
    }

    #[test]
    fn test_generated_ids_skip_taken() {
        let mut sec = AmdSec::new();
        sec.insert(Md::new("techMD", "x").with_id("AMD_1"));
        assert_eq!(sec.insert(Md::new("techMD", "y")), "AMD_2");
        assert_eq!(sec.records().len(), 2);
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let mut sec = AmdSec::new();
        sec.insert(Md::new("techMD", "old").with_id("scan"));
        sec.insert(Md::new("techMD", "new").with_id("scan"));
        assert_eq!(sec.records().len(), 1);
        assert_eq!(sec.get("scan").unwrap().content, "new");
        assert!(sec.remove("scan").is_some());
        assert!(sec.is_empty());
    }
}
