//! Structure XML parsing.
//!
//! The document is rebuilt through the ordinary graph operations, so every
//! type and cardinality rule of the ruleset applies while reading. File
//! references, technical metadata references and links are applied once the
//! whole input has been read.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::model::{
    AreaKind, Authority, ContentFile, ContentFileArea, Corporate, DigitalDocument, Md, Metadata,
    MetadataGroup, NamePart, NodeId, Person, Value,
};
use crate::prefs::{INTERNAL_PREFIX, MetadataType, Prefs};
use crate::util::{attr, attr_flag, resolve_entity};

#[derive(Clone, Copy, PartialEq)]
enum Tree {
    Logical,
    Physical,
}

/// A value whose element is still open.
enum Pending {
    Plain(Metadata),
    Person(Person),
    Corporate(Corporate),
}

/// The text-bearing element currently open.
enum Field {
    Value,
    NamePart(String),
    SubName(String),
    Md { id: String, kind: String },
}

struct FileRef {
    node: NodeId,
    file: String,
    area: Option<ContentFileArea>,
}

struct Link {
    from: Option<String>,
    to: Option<String>,
    from_deferred: Option<String>,
    to_deferred: Option<String>,
    kind: String,
}

struct Builder<'p> {
    prefs: &'p Prefs,
    doc: DigitalDocument,
    tree: Option<Tree>,
    stack: Vec<NodeId>,
    /// File-local `id` attribute to arena id.
    ids: HashMap<String, NodeId>,
    group: Option<MetadataGroup>,
    pending: Option<Pending>,
    field: Option<Field>,
    text: String,
    file_refs: Vec<FileRef>,
    tech_refs: Vec<(NodeId, String)>,
    links: Vec<Link>,
}

/// Parse structure XML against a ruleset.
pub fn read(content: &str, prefs: &Prefs) -> Result<DigitalDocument> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut b = Builder::new(prefs);
    let mut seen_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"DigitalDocument" {
                    seen_root = true;
                } else if seen_root {
                    b.start(&e)?;
                }
            }
            Ok(Event::Empty(e)) => {
                if seen_root {
                    b.start(&e)?;
                    b.end(e.name().as_ref(), true)?;
                }
            }
            Ok(Event::Text(e)) => {
                if b.field.is_some() {
                    b.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if b.field.is_some() {
                    b.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if b.field.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        b.text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                if seen_root {
                    b.end(e.name().as_ref(), false)?;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    if !seen_root {
        return Err(Error::InvalidDocument(
            "no top-level <DigitalDocument> element found".into(),
        ));
    }
    b.finish()
}

impl<'p> Builder<'p> {
    fn new(prefs: &'p Prefs) -> Self {
        Self {
            prefs,
            doc: DigitalDocument::new(),
            tree: None,
            stack: Vec::new(),
            ids: HashMap::new(),
            group: None,
            pending: None,
            field: None,
            text: String::new(),
            file_refs: Vec::new(),
            tech_refs: Vec::new(),
            links: Vec::new(),
        }
    }

    fn start(&mut self, e: &BytesStart<'_>) -> Result<()> {
        match e.name().as_ref() {
            b"Logical" => self.tree = Some(Tree::Logical),
            b"Physical" => self.tree = Some(Tree::Physical),
            b"File" => {
                let id = required(e, b"id", "File")?;
                let file = ContentFile::new(
                    id.clone(),
                    attr(e, b"location").unwrap_or_default(),
                    attr(e, b"mimetype").unwrap_or_default(),
                );
                if !self.doc.add_content_file(file) {
                    tracing::warn!(id = %id, "duplicate File ignored");
                }
            }
            b"AmdSec" => self.doc.amd_sec.id = attr(e, b"id"),
            b"Md" => {
                self.field = Some(Field::Md {
                    id: attr(e, b"id").unwrap_or_default(),
                    kind: attr(e, b"type").unwrap_or_default(),
                });
                self.text.clear();
            }
            b"DocStruct" => self.open_node(e)?,
            b"Metadata" => {
                let meta = self.metadata_from(e)?;
                self.pending = Some(Pending::Plain(meta));
                self.field = Some(Field::Value);
                self.text.clear();
            }
            b"Person" => {
                let mut meta = self.metadata_from(e)?;
                meta.value = attr(e, b"value");
                self.pending = Some(Pending::Person(Person {
                    meta,
                    first_name: attr(e, b"firstName"),
                    last_name: attr(e, b"lastName"),
                    display_name: attr(e, b"displayName"),
                    affiliation: attr(e, b"affiliation"),
                    institution: attr(e, b"institution"),
                    name_parts: Vec::new(),
                }));
            }
            b"Corporate" => {
                let mut meta = self.metadata_from(e)?;
                meta.value = attr(e, b"value");
                self.pending = Some(Pending::Corporate(Corporate {
                    meta,
                    main_name: attr(e, b"mainName"),
                    sub_names: Vec::new(),
                    part_name: attr(e, b"partName"),
                }));
            }
            b"NamePart" => {
                self.field = Some(Field::NamePart(attr(e, b"type").unwrap_or_default()));
                self.text.clear();
            }
            b"SubName" => {
                self.field = Some(Field::SubName(attr(e, b"type").unwrap_or_default()));
                self.text.clear();
            }
            b"Group" => {
                let name = required(e, b"type", "Group")?;
                let group_type = self
                    .prefs
                    .group_type(&name)
                    .ok_or_else(|| Error::InvalidDocument(format!("unknown group type '{name}'")))?;
                self.group = Some(MetadataGroup::new(group_type.clone()));
            }
            b"FileRef" => {
                let node = self.current_node("FileRef")?;
                let file = required(e, b"file", "FileRef")?;
                let area = attr(e, b"area").map(|kind| {
                    let kind = kind.parse().unwrap_or(AreaKind::Other(kind));
                    ContentFileArea::new(
                        kind,
                        attr(e, b"begin").unwrap_or_default(),
                        attr(e, b"end").unwrap_or_default(),
                    )
                });
                self.file_refs.push(FileRef { node, file, area });
            }
            b"TechMd" => {
                let node = self.current_node("TechMd")?;
                self.tech_refs.push((node, required(e, b"ref", "TechMd")?));
            }
            b"Link" => self.links.push(Link {
                from: attr(e, b"from"),
                to: attr(e, b"to"),
                from_deferred: attr(e, b"fromDeferred"),
                to_deferred: attr(e, b"toDeferred"),
                kind: attr(e, b"type").unwrap_or_default(),
            }),
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8], empty: bool) -> Result<()> {
        match name {
            b"Logical" | b"Physical" => self.tree = None,
            b"DocStruct" => {
                self.stack.pop();
            }
            b"Md" => {
                if let Some(Field::Md { id, kind }) = self.field.take() {
                    let md = Md::new(kind, std::mem::take(&mut self.text)).with_id(id);
                    self.doc.add_tech_md(md);
                }
            }
            b"NamePart" | b"SubName" => {
                let text = std::mem::take(&mut self.text);
                match (self.field.take(), self.pending.as_mut()) {
                    (Some(Field::NamePart(kind)), Some(Pending::Person(p))) => {
                        p.name_parts.push(NamePart::new(kind, text));
                    }
                    (Some(Field::SubName(kind)), Some(Pending::Corporate(c))) => {
                        c.sub_names.push(NamePart::new(kind, text));
                    }
                    _ => {}
                }
            }
            b"Metadata" | b"Person" | b"Corporate" => {
                let value = match self.pending.take() {
                    Some(Pending::Plain(mut m)) => {
                        if !empty && matches!(self.field, Some(Field::Value)) {
                            m.value = Some(std::mem::take(&mut self.text));
                        }
                        self.field = None;
                        Value::Plain(m)
                    }
                    Some(Pending::Person(p)) => Value::Person(p),
                    Some(Pending::Corporate(c)) => Value::Corporate(c),
                    None => return Ok(()),
                };
                self.attach_value(value)?;
            }
            b"Group" => {
                if let Some(group) = self.group.take() {
                    let node = self.current_node("Group")?;
                    self.doc.add_metadata_group(node, group)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn open_node(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let Some(tree) = self.tree else {
            return Err(Error::InvalidDocument(
                "DocStruct outside <Logical> or <Physical>".into(),
            ));
        };
        let type_name = required(e, b"type", "DocStruct")?;
        let doc_type = self.prefs.doc_struct_type(&type_name).ok_or_else(|| {
            Error::InvalidDocument(format!("unknown structure type '{type_name}'"))
        })?;

        let id = self.doc.create(doc_type);
        {
            let node = self.doc.get_mut(id)?;
            node.reference_to_anchor = attr(e, b"anchor");
            node.identifier = attr(e, b"identifier");
        }
        if let Some(local) = attr(e, b"id")
            && self.ids.insert(local.clone(), id).is_some()
        {
            return Err(Error::InvalidDocument(format!("duplicate DocStruct id '{local}'")));
        }

        match self.stack.last() {
            Some(&parent) => self.doc.add_child(parent, id)?,
            None => match tree {
                Tree::Logical if self.doc.logical_root().is_none() => self.doc.set_logical_root(id)?,
                Tree::Physical if self.doc.physical_root().is_none() => self.doc.set_physical_root(id)?,
                _ => {
                    return Err(Error::InvalidDocument(
                        "more than one root structure in a tree".into(),
                    ));
                }
            },
        }
        self.stack.push(id);
        Ok(())
    }

    fn metadata_from(&self, e: &BytesStart<'_>) -> Result<Metadata> {
        let name = required(e, b"type", "Metadata")?;
        let md_type = if name.starts_with(INTERNAL_PREFIX) {
            MetadataType::new(name)
        } else {
            self.prefs
                .metadata_type(&name)
                .cloned()
                .ok_or_else(|| Error::InvalidDocument(format!("unknown metadata type '{name}'")))?
        };

        let authority = Authority {
            id: attr(e, b"authorityId"),
            uri: attr(e, b"authorityUri"),
            value: attr(e, b"authorityValue"),
        };
        Ok(Metadata {
            md_type: Some(md_type),
            value: None,
            value_qualifier: attr(e, b"qualifier"),
            value_qualifier_type: attr(e, b"qualifierType"),
            authority: (!authority.is_empty()).then_some(authority),
            access_restricted: attr_flag(e, b"restricted"),
            updated: false,
        })
    }

    fn attach_value(&mut self, value: Value) -> Result<()> {
        if let Some(group) = self.group.as_mut() {
            return group.add(value);
        }
        let node = self.current_node(value.kind())?;
        self.doc.add_metadata(node, value)
    }

    fn current_node(&self, element: &str) -> Result<NodeId> {
        self.stack
            .last()
            .copied()
            .ok_or_else(|| Error::InvalidDocument(format!("<{element}> outside a DocStruct")))
    }

    fn node_ref(&self, local: &str) -> Result<NodeId> {
        self.ids
            .get(local)
            .copied()
            .ok_or_else(|| Error::InvalidDocument(format!("link to unknown DocStruct '{local}'")))
    }

    fn finish(mut self) -> Result<DigitalDocument> {
        for r in std::mem::take(&mut self.file_refs) {
            self.doc.add_content_file_reference(r.node, &r.file, r.area)?;
        }
        for (node, id) in std::mem::take(&mut self.tech_refs) {
            self.doc.attach_tech_md(node, &id)?;
        }
        for link in std::mem::take(&mut self.links) {
            self.apply_link(link)?;
        }
        tracing::debug!(nodes = self.doc.len(), "document read");
        Ok(self.doc)
    }

    fn apply_link(&mut self, link: Link) -> Result<()> {
        let deferred = |s: &str| {
            s.parse::<u64>()
                .map_err(|_| Error::InvalidDocument(format!("invalid deferred id '{s}'")))
        };
        match (link.from, link.to, link.from_deferred, link.to_deferred) {
            (Some(from), Some(to), None, None) => {
                let (from, to) = (self.node_ref(&from)?, self.node_ref(&to)?);
                self.doc.add_reference(from, to, link.kind)?;
            }
            (Some(from), None, None, Some(to)) => {
                let from = self.node_ref(&from)?;
                self.doc.add_deferred_reference(from, deferred(&to)?, link.kind)?;
            }
            (None, Some(to), Some(from), None) => {
                let to = self.node_ref(&to)?;
                self.doc.add_deferred_reference_from(to, deferred(&from)?, link.kind)?;
            }
            _ => {
                return Err(Error::InvalidDocument(
                    "<Link> needs one source and one target".into(),
                ));
            }
        }
        Ok(())
    }
}

fn required(e: &BytesStart<'_>, key: &[u8], element: &str) -> Result<String> {
    attr(e, key).ok_or_else(|| {
        Error::InvalidDocument(format!(
            "<{element}> without '{}' attribute",
            String::from_utf8_lossy(key)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{Cardinality, DocStructType};

    fn prefs() -> Prefs {
        let title = MetadataType::new("TitleDocMain");
        let mut mono = DocStructType::new("Monograph");
        mono.add_allowed_child("Chapter");
        mono.add_metadata_type(&title, Cardinality::ExactlyOne, true);
        let mut prefs = Prefs::new();
        prefs.add_metadata_type(title);
        prefs.add_doc_struct_type(mono);
        prefs.add_doc_struct_type(DocStructType::new("Chapter"));
        prefs
    }

    #[test]
    fn test_read_minimal() {
        let xml = r#"<DigitalDocument>
  <Logical>
    <DocStruct id="1" type="Monograph">
      <Metadata type="TitleDocMain">Faust &amp; Co</Metadata>
      <DocStruct id="2" type="Chapter"/>
    </DocStruct>
  </Logical>
</DigitalDocument>"#;
        let doc = read(xml, &prefs()).unwrap();
        let root = doc.logical_root().unwrap();
        let node = doc.node(root).unwrap();
        assert_eq!(node.first_value("TitleDocMain"), Some("Faust & Co"));
        assert_eq!(node.children().len(), 1);
        assert!(doc.node(node.children()[0]).unwrap().is_logical());
    }

    #[test]
    fn test_empty_element_means_no_value() {
        let xml = r#"<DigitalDocument><Logical>
  <DocStruct type="Monograph"><Metadata type="TitleDocMain"/></DocStruct>
</Logical></DigitalDocument>"#;
        let doc = read(xml, &prefs()).unwrap();
        let root = doc.node(doc.logical_root().unwrap()).unwrap();
        assert_eq!(root.metadata().next().unwrap().value, None);

        let xml = xml.replace("<Metadata type=\"TitleDocMain\"/>", "<Metadata type=\"TitleDocMain\"></Metadata>");
        let doc = read(&xml, &prefs()).unwrap();
        let root = doc.node(doc.logical_root().unwrap()).unwrap();
        assert_eq!(root.metadata().next().unwrap().value.as_deref(), Some(""));
    }

    #[test]
    fn test_schema_violations_surface() {
        let xml = r#"<DigitalDocument><Logical>
  <DocStruct type="Chapter"><DocStruct type="Monograph"/></DocStruct>
</Logical></DigitalDocument>"#;
        assert!(matches!(read(xml, &prefs()), Err(Error::TypeNotAllowed { .. })));

        let xml = r#"<DigitalDocument><Logical>
  <DocStruct type="Monograph">
    <Metadata type="TitleDocMain">a</Metadata>
    <Metadata type="TitleDocMain">b</Metadata>
  </DocStruct>
</Logical></DigitalDocument>"#;
        assert!(matches!(read(xml, &prefs()), Err(Error::CardinalityExceeded { .. })));
    }

    #[test]
    fn test_unknown_types_are_load_errors() {
        let xml = r#"<DigitalDocument><Logical><DocStruct type="Atlas"/></Logical></DigitalDocument>"#;
        let err = read(xml, &prefs()).unwrap_err();
        assert!(err.is_load_error());

        let xml = r#"<DigitalDocument><Logical>
  <DocStruct type="Monograph"><Metadata type="Shelfmark">x</Metadata></DocStruct>
</Logical></DigitalDocument>"#;
        assert!(matches!(read(xml, &prefs()), Err(Error::InvalidDocument(_))));
    }

    #[test]
    fn test_missing_root_element() {
        assert!(matches!(read("<Other/>", &prefs()), Err(Error::InvalidDocument(_))));
    }

    #[test]
    fn test_internal_metadata_is_kept() {
        let xml = r#"<DigitalDocument><Logical>
  <DocStruct type="Chapter"><Metadata type="_note">scan again</Metadata></DocStruct>
</Logical></DigitalDocument>"#;
        let doc = read(xml, &prefs()).unwrap();
        let root = doc.node(doc.logical_root().unwrap()).unwrap();
        assert_eq!(root.first_value("_note"), Some("scan again"));
    }
}
