//! Storage-format parser.
//!
//! Bodies use the `ac:` and `ri:` prefixes without declaring them, so the
//! input is wrapped in a root element that declares both before it is handed
//! to quick-xml. The wrapper maps onto [`Document::root`].

use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::document::{Document, NodeId, NodeKind};
use super::entities::convert_html_entities;
use crate::error::ReconcileError;

/// Namespaces used by Confluence storage format.
const NAMESPACES: &[(&str, &str)] = &[
    ("ac", "http://www.atlassian.com/schema/confluence/4/ac/"),
    ("ri", "http://www.atlassian.com/schema/confluence/4/ri/"),
];

/// Parse a storage-format fragment into a [`Document`].
///
/// Text split by entity references is joined back into a single run, so
/// every maximal stretch of character data is one text node.
///
/// # Errors
///
/// Returns [`ReconcileError`] if the fragment is not well-formed.
pub fn parse(html: &str) -> Result<Document, ReconcileError> {
    let html = convert_html_entities(html);
    let namespace_decls = NAMESPACES
        .iter()
        .map(|(prefix, uri)| format!(r#"xmlns:{prefix}="{uri}""#))
        .collect::<Vec<_>>()
        .join(" ");
    let wrapped = format!("<root {namespace_decls}>{html}</root>");

    let mut reader = Reader::from_str(&wrapped);
    reader.config_mut().trim_text(false);

    let mut doc = Document::new();
    // Open elements; empty until the wrapper has been read.
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if stack.is_empty() {
                    stack.push(doc.root());
                    continue;
                }
                let element = create_element(&reader, &mut doc, &e);
                attach(&mut doc, &stack, element);
                stack.push(element);
            }
            Event::Empty(e) => {
                if stack.is_empty() {
                    break;
                }
                let element = create_element(&reader, &mut doc, &e);
                attach(&mut doc, &stack, element);
            }
            Event::End(_) => {
                stack.pop();
                if stack.is_empty() {
                    break;
                }
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                push_text(&mut doc, &stack, &text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?;
                push_text(&mut doc, &stack, &decode_entity(&entity));
            }
            Event::CData(e) => {
                let content = String::from_utf8_lossy(&e).into_owned();
                push_node(&mut doc, &stack, NodeKind::CData(content));
            }
            Event::Comment(e) => {
                let content = reader.decoder().decode(&e)?.into_owned();
                push_node(&mut doc, &stack, NodeKind::Comment(content));
            }
            Event::Eof => {
                if stack.len() > 1 {
                    return Err(ReconcileError::Unclosed(stack.len() - 1));
                }
                break;
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    Ok(doc)
}

fn create_element(reader: &Reader<&[u8]>, doc: &mut Document, e: &BytesStart) -> NodeId {
    let tag = decode_name(reader, e.name().as_ref());
    let mut attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = decode_name(reader, attr.key.as_ref());
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            std::borrow::Cow::into_owned,
        );
        attrs.push((key, value));
    }
    doc.create_element(tag, attrs)
}

fn decode_name(reader: &Reader<&[u8]>, name: &[u8]) -> String {
    reader.decoder().decode(name).map_or_else(
        |_| String::from_utf8_lossy(name).into_owned(),
        std::borrow::Cow::into_owned,
    )
}

fn attach(doc: &mut Document, stack: &[NodeId], node: NodeId) {
    if let Some(&parent) = stack.last() {
        doc.append_child(parent, node);
    }
}

fn push_node(doc: &mut Document, stack: &[NodeId], kind: NodeKind) {
    if stack.is_empty() {
        return;
    }
    let node = doc.create(kind);
    attach(doc, stack, node);
}

/// Append character data, extending the previous text node if there is one.
fn push_text(doc: &mut Document, stack: &[NodeId], text: &str) {
    let Some(&parent) = stack.last() else {
        return;
    };
    if let Some(&last) = doc.children(parent).last()
        && let Some(existing) = doc.text(last)
    {
        let joined = format!("{existing}{text}");
        doc.set_text(last, joined);
        return;
    }
    let node = doc.create_text(text);
    doc.append_child(parent, node);
}

/// Resolve an entity reference left after the HTML pre-pass.
///
/// Names nothing resolves are kept as literal text.
fn decode_entity(entity: &str) -> String {
    if let Some(text) = resolve_html5_entity(entity) {
        return text.to_owned();
    }
    let resolved = entity.strip_prefix('#').and_then(|num| {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => num.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
    });
    resolved.map_or_else(|| format!("&{entity};"), |c| c.to_string())
}
