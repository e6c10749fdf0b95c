//! Structure XML serialization.

use std::collections::HashSet;

use crate::model::{
    ContentFileReference, Corporate, DigitalDocument, DocStruct, Endpoint, Metadata, MetadataGroup,
    NodeId, Person, Value,
};
use crate::util::escape_xml;

/// Serialize a document to structure XML.
///
/// Only nodes reachable from the logical or physical root are written.
/// References to nodes outside both trees are dropped.
pub fn write(doc: &DigitalDocument) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<DigitalDocument>\n");

    if !doc.file_set().is_empty() {
        out.push_str("  <FileSet>\n");
        for f in doc.file_set().files() {
            out.push_str(&format!(
                "    <File id=\"{}\" location=\"{}\" mimetype=\"{}\"/>\n",
                escape_xml(&f.id),
                escape_xml(&f.location),
                escape_xml(&f.mime_type)
            ));
        }
        out.push_str("  </FileSet>\n");
    }

    let amd = doc.amd_sec();
    if !amd.is_empty() || amd.id.is_some() {
        match &amd.id {
            Some(id) => out.push_str(&format!("  <AmdSec id=\"{}\">\n", escape_xml(id))),
            None => out.push_str("  <AmdSec>\n"),
        }
        for md in amd.records() {
            out.push_str(&format!(
                "    <Md id=\"{}\" type=\"{}\">{}</Md>\n",
                escape_xml(&md.id),
                escape_xml(&md.kind),
                escape_xml(&md.content)
            ));
        }
        out.push_str("  </AmdSec>\n");
    }

    let mut written = HashSet::new();
    for (tag, root) in [("Logical", doc.logical_root()), ("Physical", doc.physical_root())] {
        let Some(root) = root else {
            continue;
        };
        out.push_str(&format!("  <{tag}>\n"));
        write_tree(doc, root, &mut out, &mut written);
        out.push_str(&format!("  </{tag}>\n"));
    }

    write_links(doc, &written, &mut out);
    out.push_str("</DigitalDocument>\n");
    out
}

/// Iterative pre-order walk emitting nested `<DocStruct>` elements.
fn write_tree(doc: &DigitalDocument, root: NodeId, out: &mut String, written: &mut HashSet<NodeId>) {
    enum Step {
        Open(NodeId, usize),
        Close(usize),
    }

    let mut stack = vec![Step::Open(root, 2)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Close(depth) => {
                out.push_str(&format!("{}</DocStruct>\n", indent(depth)));
            }
            Step::Open(id, depth) => {
                let Some(node) = doc.node(id) else {
                    continue;
                };
                written.insert(id);
                let pad = indent(depth);
                out.push_str(&format!("{pad}<DocStruct id=\"{}\"", id.0));
                if let Some(t) = node.type_name() {
                    push_attr(out, "type", t);
                }
                if let Some(anchor) = &node.reference_to_anchor {
                    push_attr(out, "anchor", anchor);
                }
                if let Some(identifier) = &node.identifier {
                    push_attr(out, "identifier", identifier);
                }

                let has_body = !node.values().is_empty()
                    || !node.groups().is_empty()
                    || !node.content_files().is_empty()
                    || !node.tech_md_ids().is_empty()
                    || !node.children().is_empty();
                if !has_body {
                    out.push_str("/>\n");
                    continue;
                }
                out.push_str(">\n");
                write_body(node, depth + 1, out);

                stack.push(Step::Close(depth));
                for child in node.children().iter().rev() {
                    stack.push(Step::Open(*child, depth + 1));
                }
            }
        }
    }
}

fn write_body(node: &DocStruct, depth: usize, out: &mut String) {
    let pad = indent(depth);
    for value in node.values() {
        write_value(value, depth, out);
    }
    for group in node.groups() {
        write_group(group, depth, out);
    }
    for r in node.content_files() {
        write_file_ref(r, &pad, out);
    }
    for id in node.tech_md_ids() {
        out.push_str(&format!("{pad}<TechMd ref=\"{}\"/>\n", escape_xml(id)));
    }
}

fn write_group(group: &MetadataGroup, depth: usize, out: &mut String) {
    let pad = indent(depth);
    out.push_str(&format!("{pad}<Group"));
    if let Some(t) = group.type_name() {
        push_attr(out, "type", t);
    }
    if group.values().is_empty() {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");
    for value in group.values() {
        write_value(value, depth + 1, out);
    }
    out.push_str(&format!("{pad}</Group>\n"));
}

fn write_file_ref(r: &ContentFileReference, pad: &str, out: &mut String) {
    out.push_str(&format!("{pad}<FileRef file=\"{}\"", escape_xml(&r.file)));
    if let Some(area) = &r.area {
        push_attr(out, "area", area.kind.as_str());
        push_attr(out, "begin", &area.begin);
        push_attr(out, "end", &area.end);
    }
    out.push_str("/>\n");
}

fn write_value(value: &Value, depth: usize, out: &mut String) {
    let pad = indent(depth);
    match value {
        Value::Plain(m) => {
            out.push_str(&format!("{pad}<Metadata"));
            push_meta_attrs(m, out);
            match &m.value {
                Some(v) => out.push_str(&format!(">{}</Metadata>\n", escape_xml(v))),
                None => out.push_str("/>\n"),
            }
        }
        Value::Person(p) => write_person(p, &pad, out),
        Value::Corporate(c) => write_corporate(c, &pad, out),
    }
}

fn write_person(p: &Person, pad: &str, out: &mut String) {
    out.push_str(&format!("{pad}<Person"));
    push_meta_attrs(&p.meta, out);
    if let Some(v) = &p.meta.value {
        push_attr(out, "value", v);
    }
    for (key, field) in [
        ("firstName", &p.first_name),
        ("lastName", &p.last_name),
        ("displayName", &p.display_name),
        ("affiliation", &p.affiliation),
        ("institution", &p.institution),
    ] {
        if let Some(v) = field {
            push_attr(out, key, v);
        }
    }
    if p.name_parts.is_empty() {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");
    for part in &p.name_parts {
        out.push_str(&format!(
            "{pad}  <NamePart type=\"{}\">{}</NamePart>\n",
            escape_xml(&part.kind),
            escape_xml(&part.value)
        ));
    }
    out.push_str(&format!("{pad}</Person>\n"));
}

fn write_corporate(c: &Corporate, pad: &str, out: &mut String) {
    out.push_str(&format!("{pad}<Corporate"));
    push_meta_attrs(&c.meta, out);
    if let Some(v) = &c.meta.value {
        push_attr(out, "value", v);
    }
    if let Some(v) = &c.main_name {
        push_attr(out, "mainName", v);
    }
    if let Some(v) = &c.part_name {
        push_attr(out, "partName", v);
    }
    if c.sub_names.is_empty() {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");
    for sub in &c.sub_names {
        out.push_str(&format!(
            "{pad}  <SubName type=\"{}\">{}</SubName>\n",
            escape_xml(&sub.kind),
            escape_xml(&sub.value)
        ));
    }
    out.push_str(&format!("{pad}</Corporate>\n"));
}

fn push_meta_attrs(m: &Metadata, out: &mut String) {
    if let Some(t) = m.type_name() {
        push_attr(out, "type", t);
    }
    if let Some(q) = &m.value_qualifier {
        push_attr(out, "qualifier", q);
    }
    if let Some(q) = &m.value_qualifier_type {
        push_attr(out, "qualifierType", q);
    }
    if let Some(a) = &m.authority {
        for (key, field) in [
            ("authorityId", &a.id),
            ("authorityUri", &a.uri),
            ("authorityValue", &a.value),
        ] {
            if let Some(v) = field {
                push_attr(out, key, v);
            }
        }
    }
    if m.access_restricted {
        out.push_str(" restricted=\"true\"");
    }
}

fn write_links(doc: &DigitalDocument, written: &HashSet<NodeId>, out: &mut String) {
    let mut links = String::new();
    let mut ids: Vec<_> = written.iter().copied().collect();
    ids.sort();

    for id in ids {
        let Some(node) = doc.node(id) else {
            continue;
        };
        for r in node.references_to() {
            match r.target {
                Endpoint::Node(target) if written.contains(&target) => {
                    links.push_str(&format!("    <Link from=\"{}\" to=\"{}\"", id.0, target.0));
                }
                Endpoint::Deferred(target) => {
                    links.push_str(&format!("    <Link from=\"{}\" toDeferred=\"{target}\"", id.0));
                }
                Endpoint::Node(_) => continue,
            }
            push_attr(&mut links, "type", &r.kind);
            links.push_str("/>\n");
        }
        for r in node.references_from() {
            if let Endpoint::Deferred(source) = r.source {
                links.push_str(&format!("    <Link fromDeferred=\"{source}\" to=\"{}\"", id.0));
                push_attr(&mut links, "type", &r.kind);
                links.push_str("/>\n");
            }
        }
    }

    if !links.is_empty() {
        out.push_str("  <Links>\n");
        out.push_str(&links);
        out.push_str("  </Links>\n");
    }
}

fn push_attr(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!(" {key}=\"{}\"", escape_xml(value)));
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
