//! Ruleset loading tests against the sample ruleset in `tests/fixtures`.

use std::io::Write;

use docstruct::{Cardinality, Error, Prefs};
use tempfile::NamedTempFile;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> String {
    format!("{}/{}", FIXTURES_DIR, name)
}

fn ruleset() -> Prefs {
    Prefs::load(fixture_path("ruleset.xml")).expect("Failed to load ruleset")
}

#[test]
fn test_load_fixture() {
    let prefs = ruleset();
    let names: Vec<_> = prefs.doc_struct_types().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Periodical", "Monograph", "Chapter", "BoundBook", "page"]);
    assert_eq!(prefs.metadata_types().len(), 10);
    assert_eq!(prefs.group_types().len(), 1);
}

#[test]
fn test_structure_type_flags() {
    let prefs = ruleset();
    let mono = prefs.doc_struct_type("Monograph").unwrap();
    assert!(mono.is_topmost);
    assert!(!mono.is_anchor);
    assert!(mono.has_file_set);
    assert_eq!(mono.display_name("de"), "Monographie");
    assert_eq!(mono.display_name("fr"), "Monograph");

    let book = prefs.doc_struct_type("BoundBook").unwrap();
    assert!(!book.has_file_set);

    let anchors: Vec<_> = prefs.anchor_types().map(|t| t.name.clone()).collect();
    assert_eq!(anchors, vec!["Periodical"]);
}

#[test]
fn test_cardinalities_from_references() {
    let prefs = ruleset();
    assert_eq!(
        prefs.allowed_cardinality("Monograph", "TitleDocMain"),
        Some(Cardinality::ExactlyOne)
    );
    assert_eq!(prefs.allowed_cardinality("Monograph", "Subject"), Some(Cardinality::OneOrMore));
    assert_eq!(prefs.allowed_cardinality("Chapter", "TitleDocMain"), Some(Cardinality::AtMostOne));
    assert_eq!(prefs.allowed_cardinality("Chapter", "Subject"), None);
    assert!(prefs.resolve_child("Monograph", "Chapter"));
    assert!(prefs.resolve_child("Chapter", "Chapter"));
    assert!(!prefs.resolve_child("Chapter", "Monograph"));
}

#[test]
fn test_metadata_type_attributes() {
    let prefs = ruleset();
    let author = prefs.metadata_type("Author").unwrap();
    assert!(author.is_person);
    assert!(author.allow_name_parts);
    assert!(author.allow_authority);
    assert_eq!(author.display_name("de"), "Autor");

    let ppn = prefs.metadata_type("CatalogIDDigital").unwrap();
    assert!(ppn.is_identifier);
    assert!(ppn.accepts_value("PPN123456789"));
    assert!(!ppn.accepts_value("123456789"));

    let subject = prefs.metadata_type("Subject").unwrap();
    assert_eq!(subject.num, Cardinality::ZeroOrMore);
}

#[test]
fn test_group_members() {
    let prefs = ruleset();
    let series = prefs.group_type("Series").unwrap();
    assert_eq!(series.members().len(), 2);
    assert_eq!(series.member("SeriesTitle").unwrap().cardinality, Cardinality::ExactlyOne);
    let mono = prefs.doc_struct_type("Monograph").unwrap();
    assert_eq!(mono.group_rule("Series").unwrap().cardinality, Cardinality::AtMostOne);
}

#[test]
fn test_default_display() {
    let prefs = ruleset();
    let mono = prefs.doc_struct_type("Monograph").unwrap();
    let shown: Vec<_> = mono.default_display_metadata_types().map(|t| t.name.as_str()).collect();
    assert_eq!(shown, vec!["TitleDocMain", "Author"]);
}

#[test]
fn test_load_latin1_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<Preferences>\n")
        .unwrap();
    file.write_all(b"<DocStrctType><Name>Kapitel</Name><language name=\"de\">Gr\xFC\xDFe</language></DocStrctType>\n")
        .unwrap();
    file.write_all(b"</Preferences>\n").unwrap();

    let prefs = Prefs::load(file.path()).unwrap();
    let t = prefs.doc_struct_type("Kapitel").unwrap();
    assert_eq!(t.display_name("de"), "Grüße");
}

#[test]
fn test_load_errors() {
    let empty = NamedTempFile::new().unwrap();
    assert!(matches!(Prefs::load(empty.path()), Err(Error::Preferences(_))));
    assert!(matches!(Prefs::from_xml("<Other/>"), Err(Error::Preferences(_))));
    assert!(Prefs::load("/nonexistent/ruleset.xml").unwrap_err().is_load_error());
}

#[test]
fn test_unknown_references_are_skipped() {
    let prefs = Prefs::from_xml(
        r#"<Preferences>
          <MetadataType><Name>Title</Name></MetadataType>
          <DocStrctType>
            <Name>Chapter</Name>
            <metadata num="1m">Title</metadata>
            <metadata num="1m">Missing</metadata>
            <metadata num="bogus">Title</metadata>
          </DocStrctType>
        </Preferences>"#,
    )
    .unwrap();
    let chapter = prefs.doc_struct_type("Chapter").unwrap();
    assert_eq!(chapter.metadata_rules().len(), 1);
    assert_eq!(chapter.cardinality_of("Title"), Some(Cardinality::ExactlyOne));
}
