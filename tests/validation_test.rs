//! Validator scenarios.

use docstruct::validate::{
    find_missing_mandatory_metadata, find_unlinked_logical_nodes, find_unlinked_physical_pages,
};
use docstruct::{
    Cardinality, DigitalDocument, DocStructType, Metadata, MetadataType, NodeId, Prefs, validate,
};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> String {
    format!("{}/{}", FIXTURES_DIR, name)
}

fn title_prefs() -> Prefs {
    let title = MetadataType::new("Title");
    let mut work = DocStructType::new("Work");
    work.add_allowed_child("Section");
    work.add_metadata_type(&title, Cardinality::ExactlyOne, true);
    let mut prefs = Prefs::new();
    prefs.add_metadata_type(title);
    prefs.add_doc_struct_type(work);
    prefs.add_doc_struct_type(DocStructType::new("Section"));
    prefs.add_doc_struct_type(DocStructType::new("Page"));
    prefs
}

fn create(doc: &mut DigitalDocument, prefs: &Prefs, name: &str) -> NodeId {
    doc.create(prefs.doc_struct_type(name).unwrap())
}

#[test]
fn test_unlinked_child_reported_until_linked() {
    let prefs = title_prefs();
    let mut doc = DigitalDocument::new();
    let root = create(&mut doc, &prefs, "Work");
    let section = create(&mut doc, &prefs, "Section");
    let page = create(&mut doc, &prefs, "Page");
    doc.set_logical_root(root).unwrap();
    doc.add_child(root, section).unwrap();

    assert_eq!(find_unlinked_logical_nodes(&doc, root), vec![section]);
    doc.add_reference(section, page, "logical_physical").unwrap();
    assert!(find_unlinked_logical_nodes(&doc, root).is_empty());
}

#[test]
fn test_mandatory_title_scenarios() {
    let prefs = title_prefs();
    let title = prefs.metadata_type("Title").unwrap().clone();
    let mut doc = DigitalDocument::new();
    let root = create(&mut doc, &prefs, "Work");

    let missing = find_missing_mandatory_metadata(&doc, root);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].node, root);
    assert_eq!(missing[0].cardinality, Cardinality::ExactlyOne);

    doc.add_metadata(root, Metadata::new(title.clone()).with_value("Faust"))
        .unwrap();
    assert!(find_missing_mandatory_metadata(&doc, root).is_empty());

    let mut other = DigitalDocument::new();
    let empty_root = create(&mut other, &prefs, "Work");
    other
        .add_metadata(empty_root, Metadata::new(title).with_value(""))
        .unwrap();
    let missing = find_missing_mandatory_metadata(&other, empty_root);
    assert_eq!(missing.len(), 1);
    assert!(missing[0].empty);
    assert!(missing[0].to_string().contains("empty"));
}

#[test]
fn test_fixture_document_is_valid() {
    let prefs = Prefs::load(fixture_path("ruleset.xml")).unwrap();
    let doc = docstruct::read_document(fixture_path("monograph.xml"), &prefs).unwrap();
    let report = validate(&doc);
    assert!(report.is_valid(), "unexpected diagnostics: {:?}", report.diagnostics);
}

#[test]
fn test_fixture_document_problems() {
    let prefs = Prefs::load(fixture_path("ruleset.xml")).unwrap();
    let mut doc = docstruct::read_document(fixture_path("monograph.xml"), &prefs).unwrap();
    let root = doc.logical_root().unwrap();
    let book = doc.physical_root().unwrap();
    let chapter = doc.node(root).unwrap().children()[0];
    let first_page = doc.node(book).unwrap().children()[0];

    // Unlink the chapter and the title page.
    let page_of_chapter = doc.node(chapter).unwrap().reference_targets().next().unwrap();
    doc.remove_reference_to(chapter, page_of_chapter);
    doc.remove_reference_from(first_page, root);

    assert_eq!(find_unlinked_logical_nodes(&doc, root), vec![chapter]);
    let pages = find_unlinked_physical_pages(&doc, book);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].position, 1);
    assert_eq!(pages[0].phys_page_number.as_deref(), Some("1"));
    assert_eq!(pages[0].logical_page_number.as_deref(), Some("uncounted"));

    let report = validate(&doc);
    assert!(!report.is_valid());
    assert_eq!(report.len(), 2);
}
