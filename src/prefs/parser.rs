//! Ruleset parsing.
//!
//! A ruleset is a `<Preferences>` document declaring metadata types,
//! metadata groups and structure types:
//!
//! ```xml
//! <Preferences>
//!   <MetadataType type="person"><Name>Author</Name></MetadataType>
//!   <DocStrctType topStruct="true">
//!     <Name>Monograph</Name>
//!     <language name="en">Monograph</language>
//!     <allowedchildtype>Chapter</allowedchildtype>
//!     <metadata num="+" DefaultDisplay="true">Author</metadata>
//!   </DocStrctType>
//! </Preferences>
//! ```
//!
//! Declarations may appear in any order; references from structure types and
//! groups to metadata types are resolved after the whole file is read.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::registry::Prefs;
use super::struct_type::DocStructType;
use super::types::{MetadataGroupType, MetadataType};
use super::Cardinality;
use crate::error::{Error, Result};
use crate::util::{attr, attr_flag, resolve_entity};

/// A reference from a structure type or group to a declared type.
struct TypeRef {
    name: String,
    num: Option<String>,
    default_display: bool,
}

struct RawGroup {
    group_type: MetadataGroupType,
    members: Vec<TypeRef>,
}

struct RawStruct {
    doc_type: DocStructType,
    metadata: Vec<TypeRef>,
    groups: Vec<TypeRef>,
}

enum Section {
    Metadata(MetadataType),
    Group(RawGroup),
    Struct(RawStruct),
}

/// The text-bearing element currently open inside a section.
enum Field {
    Name,
    Language(String),
    ChildType,
    Validation,
    MetadataRef { num: Option<String>, default_display: bool },
    GroupRef { num: Option<String> },
}

/// Parse state. Sections open only on direct children of `<Preferences>`,
/// fields only on direct children of a section.
#[derive(Default)]
struct Parser {
    seen_root: bool,
    section: Option<Section>,
    field: Option<Field>,
    text: String,
    metadata_types: Vec<MetadataType>,
    groups: Vec<RawGroup>,
    structs: Vec<RawStruct>,
}

impl Parser {
    /// Handle an element opening at nesting `level` (0 = document root).
    fn open(&mut self, e: &BytesStart<'_>, level: usize) {
        let name = e.name();
        match (level, name.as_ref()) {
            (0, b"Preferences") => self.seen_root = true,
            (1, b"MetadataType") if self.seen_root => {
                self.section = Some(Section::Metadata(metadata_type_from(e)));
            }
            (1, b"Group") if self.seen_root => {
                let mut group_type = MetadataGroupType::new("");
                if let Some(num) = attr(e, b"num") {
                    set_group_num(&mut group_type, &num);
                }
                self.section = Some(Section::Group(RawGroup {
                    group_type,
                    members: Vec::new(),
                }));
            }
            (1, b"DocStrctType") if self.seen_root => {
                let mut doc_type = DocStructType::new("");
                doc_type.is_anchor = attr_flag(e, b"anchor");
                doc_type.is_topmost = attr_flag(e, b"topStruct");
                doc_type.has_file_set = attr(e, b"fileset")
                    .is_none_or(|v| !v.trim().eq_ignore_ascii_case("false"));
                self.section = Some(Section::Struct(RawStruct {
                    doc_type,
                    metadata: Vec::new(),
                    groups: Vec::new(),
                }));
            }
            (2, other) if self.section.is_some() => {
                self.field = field_for(other, e);
                self.text.clear();
            }
            _ => {}
        }
    }

    /// Handle an element closing at nesting `level`.
    fn close(&mut self, level: usize) -> Result<()> {
        match level {
            1 => match self.section.take() {
                Some(Section::Metadata(t)) => self.metadata_types.push(t),
                Some(Section::Group(g)) => self.groups.push(g),
                Some(Section::Struct(s)) => self.structs.push(s),
                None => {}
            },
            2 => {
                if let Some(f) = self.field.take()
                    && let Some(s) = self.section.as_mut()
                {
                    apply_field(s, f, self.text.trim())?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if self.field.is_some() {
            self.text.push_str(text);
        }
    }
}

pub(crate) fn parse_prefs(content: &str) -> Result<Prefs> {
    if content.trim().is_empty() {
        return Err(Error::Preferences("ruleset is empty".into()));
    }

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut parser = Parser::default();
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                parser.open(&e, depth);
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                parser.open(&e, depth);
                parser.close(depth)?;
            }
            Ok(Event::Text(e)) => parser.push_text(&String::from_utf8_lossy(e.as_ref())),
            Ok(Event::CData(e)) => parser.push_text(&String::from_utf8_lossy(&e)),
            Ok(Event::GeneralRef(e)) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                if let Some(resolved) = resolve_entity(&entity) {
                    parser.push_text(&resolved);
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                parser.close(depth)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Preferences(format!("malformed ruleset: {e}"))),
            _ => {}
        }
    }

    if !parser.seen_root {
        return Err(Error::Preferences(
            "no top-level <Preferences> element found".into(),
        ));
    }

    resolve(parser.metadata_types, parser.groups, parser.structs)
}

fn metadata_type_from(e: &BytesStart<'_>) -> MetadataType {
    let mut t = MetadataType::new("");
    match attr(e, b"type").as_deref() {
        Some("person") => t.is_person = true,
        Some("corporate") => t.is_corporate = true,
        Some("identifier") => t.is_identifier = true,
        _ => {}
    }
    t.allow_name_parts = attr_flag(e, b"allowNameParts");
    t.allow_authority = attr_flag(e, b"authority");
    if let Some(num) = attr(e, b"num")
        && !t.set_num(&num)
    {
        tracing::warn!(code = %num, "ignoring unknown cardinality on MetadataType");
    }
    t
}

fn set_group_num(group_type: &mut MetadataGroupType, code: &str) {
    match Cardinality::from_code(code) {
        Some(num) => group_type.num = num,
        None => tracing::warn!(code = %code, "ignoring unknown cardinality on Group"),
    }
}

fn field_for(name: &[u8], e: &BytesStart<'_>) -> Option<Field> {
    match name {
        b"Name" => Some(Field::Name),
        b"language" => attr(e, b"name").map(Field::Language),
        b"allowedchildtype" => Some(Field::ChildType),
        b"validationExpression" => Some(Field::Validation),
        b"metadata" => Some(Field::MetadataRef {
            num: attr(e, b"num"),
            default_display: attr_flag(e, b"DefaultDisplay"),
        }),
        b"group" => Some(Field::GroupRef {
            num: attr(e, b"num"),
        }),
        _ => None,
    }
}

fn apply_field(section: &mut Section, field: Field, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    match (section, field) {
        (Section::Metadata(t), Field::Name) => t.name = text.to_string(),
        (Section::Metadata(t), Field::Language(lang)) => t.names.set(lang, text),
        (Section::Metadata(t), Field::Validation) => t.set_validation_expression(text)?,
        (Section::Group(g), Field::Name) => g.group_type.name = text.to_string(),
        (Section::Group(g), Field::Language(lang)) => g.group_type.names.set(lang, text),
        (Section::Group(g), Field::MetadataRef { num, .. }) => g.members.push(TypeRef {
            name: text.to_string(),
            num,
            default_display: false,
        }),
        (Section::Struct(s), Field::Name) => s.doc_type.name = text.to_string(),
        (Section::Struct(s), Field::Language(lang)) => s.doc_type.names.set(lang, text),
        (Section::Struct(s), Field::ChildType) => {
            s.doc_type.add_allowed_child(text);
        }
        (Section::Struct(s), Field::MetadataRef { num, default_display }) => {
            s.metadata.push(TypeRef {
                name: text.to_string(),
                num,
                default_display,
            })
        }
        (Section::Struct(s), Field::GroupRef { num }) => s.groups.push(TypeRef {
            name: text.to_string(),
            num,
            default_display: false,
        }),
        _ => {}
    }
    Ok(())
}

/// Cardinality for a reference: the explicit `num` when it parses, the
/// referenced type's own otherwise.
fn reference_cardinality(owner: &str, r: &TypeRef, fallback: Cardinality) -> Cardinality {
    match r.num.as_deref() {
        None => fallback,
        Some(code) => Cardinality::from_code(code).unwrap_or_else(|| {
            tracing::warn!(
                owner = %owner,
                reference = %r.name,
                code = %code,
                "unknown cardinality, keeping {fallback}"
            );
            fallback
        }),
    }
}

fn resolve(
    metadata_types: Vec<MetadataType>,
    groups: Vec<RawGroup>,
    structs: Vec<RawStruct>,
) -> Result<Prefs> {
    let mut prefs = Prefs::new();

    for t in metadata_types {
        if t.name.is_empty() {
            return Err(Error::Preferences("MetadataType without <Name>".into()));
        }
        let name = t.name.clone();
        if !prefs.add_metadata_type(t) {
            tracing::warn!(name = %name, "duplicate MetadataType ignored");
        }
    }

    for raw in groups {
        let mut group_type = raw.group_type;
        if group_type.name.is_empty() {
            return Err(Error::Preferences("Group without <Name>".into()));
        }
        for r in &raw.members {
            let Some(md_type) = prefs.metadata_type(&r.name) else {
                tracing::warn!(group = %group_type.name, metadata = %r.name, "unknown MetadataType in Group");
                continue;
            };
            let num = reference_cardinality(&group_type.name, r, md_type.num);
            group_type.add_metadata_type(md_type, num);
        }
        let name = group_type.name.clone();
        if !prefs.add_group_type(group_type) {
            tracing::warn!(name = %name, "duplicate Group ignored");
        }
    }

    for raw in structs {
        let mut doc_type = raw.doc_type;
        if doc_type.name.is_empty() {
            return Err(Error::Preferences("DocStrctType without <Name>".into()));
        }
        for r in &raw.metadata {
            let Some(md_type) = prefs.metadata_type(&r.name) else {
                tracing::warn!(doc_struct = %doc_type.name, metadata = %r.name, "unknown MetadataType in DocStrctType");
                continue;
            };
            let num = reference_cardinality(&doc_type.name, r, md_type.num);
            doc_type.add_metadata_type(md_type, num, r.default_display);
        }
        for r in &raw.groups {
            let Some(group_type) = prefs.group_type(&r.name) else {
                tracing::warn!(doc_struct = %doc_type.name, group = %r.name, "unknown Group in DocStrctType");
                continue;
            };
            let num = reference_cardinality(&doc_type.name, r, group_type.num);
            doc_type.add_group_type(group_type, num);
        }
        let name = doc_type.name.clone();
        if !prefs.add_doc_struct_type(doc_type) {
            tracing::warn!(name = %name, "duplicate DocStrctType ignored");
        }
    }

    tracing::debug!(
        doc_struct_types = prefs.doc_struct_types().count(),
        metadata_types = prefs.metadata_types().len(),
        group_types = prefs.group_types().len(),
        "ruleset loaded"
    );
    Ok(prefs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULESET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Preferences>
  <DocStrctType topStruct="true">
    <Name>Monograph</Name>
    <language name="de">Monographie</language>
    <allowedchildtype>Chapter</allowedchildtype>
    <metadata num="1m" DefaultDisplay="true">TitleDocMain</metadata>
    <metadata num="bogus">Author</metadata>
    <metadata>Missing</metadata>
    <group num="*">Series</group>
  </DocStrctType>
  <MetadataType><Name>TitleDocMain</Name><language name="en">Main title</language></MetadataType>
  <MetadataType type="person" num="*" allowNameParts="true"><Name>Author</Name></MetadataType>
  <MetadataType type="identifier"><Name>CatalogIDDigital</Name>
    <validationExpression>^PPN\d+$</validationExpression>
  </MetadataType>
  <Group><Name>Series</Name><metadata num="1m">TitleDocMain</metadata></Group>
  <DocStrctType anchor="true" fileset="false"><Name>Periodical &amp; Co</Name></DocStrctType>
</Preferences>"#;

    #[test]
    fn test_parse_ruleset() {
        let prefs = parse_prefs(RULESET).unwrap();

        let mono = prefs.doc_struct_type("Monograph").unwrap();
        assert!(mono.is_topmost);
        assert!(mono.has_file_set);
        assert_eq!(mono.display_name("de"), "Monographie");
        assert!(mono.allows_child("Chapter"));
        assert_eq!(mono.cardinality_of("TitleDocMain"), Some(Cardinality::ExactlyOne));
        // Unknown code falls back to the type's own cardinality.
        assert_eq!(mono.cardinality_of("Author"), Some(Cardinality::ZeroOrMore));
        assert_eq!(mono.cardinality_of("Missing"), None);
        assert_eq!(mono.default_display_metadata_types().count(), 1);
        assert!(mono.group_rule("Series").is_some());

        let author = prefs.metadata_type("Author").unwrap();
        assert!(author.is_person);
        assert!(author.allow_name_parts);

        let id = prefs.metadata_type("CatalogIDDigital").unwrap();
        assert!(id.is_identifier);
        assert!(id.accepts_value("PPN123"));
        assert!(!id.accepts_value("123"));

        let series = prefs.group_type("Series").unwrap();
        assert_eq!(series.members().len(), 1);

        let periodical = prefs.doc_struct_type("Periodical & Co").unwrap();
        assert!(periodical.is_anchor);
        assert!(!periodical.has_file_set);
    }

    #[test]
    fn test_empty_source() {
        assert!(matches!(parse_prefs("  \n"), Err(Error::Preferences(_))));
    }

    #[test]
    fn test_missing_root() {
        let err = parse_prefs("<Ruleset><MetadataType/></Ruleset>").unwrap_err();
        assert!(matches!(err, Error::Preferences(_)));
    }

    #[test]
    fn test_nameless_type_rejected() {
        let err = parse_prefs("<Preferences><MetadataType></MetadataType></Preferences>").unwrap_err();
        assert!(matches!(err, Error::Preferences(_)));
    }

    #[test]
    fn test_self_closing_declarations_are_not_dropped() {
        let err = parse_prefs("<Preferences><DocStrctType anchor=\"true\"/></Preferences>").unwrap_err();
        assert!(matches!(err, Error::Preferences(ref m) if m.contains("DocStrctType")));

        let prefs = parse_prefs(
            "<Preferences><MetadataType><Name>Title</Name><language name=\"de\"/></MetadataType>\
             <DocStrctType><Name>Chapter</Name><metadata num=\"1o\">Title</metadata>\
             <allowedchildtype/></DocStrctType></Preferences>",
        )
        .unwrap();
        let chapter = prefs.doc_struct_type("Chapter").unwrap();
        assert_eq!(chapter.cardinality_of("Title"), Some(Cardinality::AtMostOne));
        assert!(chapter.allowed_children().is_empty());
    }

    #[test]
    fn test_nested_groups_outside_sections_are_ignored() {
        let xml = r#"<Preferences>
          <MetadataType><Name>Title</Name></MetadataType>
          <Formats>
            <Export>
              <Group><InternalName>Series</InternalName></Group>
            </Export>
          </Formats>
          <Group><Name>Series</Name><metadata num="1m">Title</metadata></Group>
        </Preferences>"#;
        let prefs = parse_prefs(xml).unwrap();
        assert_eq!(prefs.group_types().len(), 1);
        assert_eq!(prefs.group_type("Series").unwrap().members().len(), 1);
    }

    #[test]
    fn test_bad_validation_expression() {
        let xml = "<Preferences><MetadataType><Name>X</Name>\
                   <validationExpression>([</validationExpression></MetadataType></Preferences>";
        assert!(parse_prefs(xml).is_err());
    }
}
