//! Storage-format serializer.

use super::document::{Document, NodeId, NodeKind};

/// HTML elements that never have content.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Serialize the whole document, without the synthetic root.
#[must_use]
pub fn serialize(doc: &Document) -> String {
    serialize_children(doc, doc.root())
}

/// Serialize the children of `id`, without `id` itself.
#[must_use]
pub fn serialize_children(doc: &Document, id: NodeId) -> String {
    let mut out = String::with_capacity(4096);
    for &child in doc.children(id) {
        write_node(doc, child, &mut out);
    }
    out
}

/// Serialize a single node and its subtree.
#[must_use]
pub fn serialize_node(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        NodeKind::Root => {
            for &child in doc.children(id) {
                write_node(doc, child, out);
            }
        }
        NodeKind::Text(text) => out.push_str(&escape_xml(text, false)),
        NodeKind::CData(content) => {
            out.push_str("<![CDATA[");
            out.push_str(content);
            out.push_str("]]>");
        }
        NodeKind::Comment(content) => {
            out.push_str("<!--");
            out.push_str(content);
            out.push_str("-->");
        }
        NodeKind::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for (key, value) in attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape_xml(value, true));
                out.push('"');
            }

            let children = doc.children(id);
            if children.is_empty() && self_closes(tag) {
                out.push_str(" />");
                return;
            }

            out.push('>');
            for &child in children {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

/// Childless elements written as `<tag />`. Other HTML elements keep an
/// explicit end tag, so `<p></p>` stays as written.
fn self_closes(tag: &str) -> bool {
    tag.contains(':') || VOID_ELEMENTS.contains(&tag)
}

/// Escape XML special characters, quotes too inside attribute values.
pub(crate) fn escape_xml(text: &str, in_attribute: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if in_attribute => result.push_str("&quot;"),
            '\'' if in_attribute => result.push_str("&apos;"),
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::markup::parse;

    fn round_trip(html: &str) -> String {
        serialize(&parse(html).unwrap())
    }

    #[test]
    fn test_serialize_nested_markup() {
        assert_eq!(
            round_trip("<p><strong>Bold</strong> text</p>"),
            "<p><strong>Bold</strong> text</p>"
        );
    }

    #[test]
    fn test_serialize_empty_element_self_closes() {
        assert_eq!(round_trip("<p>Before<br/>After</p>"), "<p>Before<br />After</p>");
    }

    #[test]
    fn test_serialize_empty_html_element_keeps_end_tag() {
        assert_eq!(
            round_trip("<table><tr><td></td><td>x</td></tr></table><p></p>"),
            "<table><tr><td></td><td>x</td></tr></table><p></p>"
        );
        assert_eq!(round_trip("<p/>"), "<p></p>");
    }

    #[test]
    fn test_serialize_empty_prefixed_element_self_closes() {
        let html = r#"<p><ac:link><ri:page ri:content-title="Home" /></ac:link><ac:emoticon ac:name="smile" /></p>"#;
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_serialize_escapes_text_and_attributes() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element(
            "a",
            vec![("title".to_owned(), r#"say "hi" & go"#.to_owned())],
        );
        doc.append_child(root, a);
        let t = doc.create_text("a < b > c");
        doc.append_child(a, t);

        assert_eq!(
            serialize(&doc),
            r#"<a title="say &quot;hi&quot; &amp; go">a &lt; b &gt; c</a>"#
        );
    }

    #[test]
    fn test_serialize_keeps_cdata() {
        let html = r#"<ac:structured-macro ac:name="code"><ac:plain-text-body><![CDATA[if a < b && c]]></ac:plain-text-body></ac:structured-macro>"#;
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_serialize_node_and_children() {
        let doc = parse("<ul><li>one</li><li>two</li></ul>").unwrap();
        let ul = doc.children(doc.root())[0];

        assert_eq!(serialize_node(&doc, doc.children(ul)[1]), "<li>two</li>");
        assert_eq!(serialize_children(&doc, ul), "<li>one</li><li>two</li>");
    }
}
