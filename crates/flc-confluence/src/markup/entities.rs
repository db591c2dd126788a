//! Named HTML entities in storage-format bodies.
//!
//! Confluence returns HTML entities such as `&nbsp;` or `&eacute;` that an
//! XML parser rejects. They are rewritten to the characters they stand for
//! before parsing. The five XML entities and CDATA sections pass through
//! untouched.

use std::sync::LazyLock;

use quick_xml::escape::{escape, resolve_html5_entity, resolve_xml_entity};
use regex::Regex;

/// CDATA sections (kept verbatim) or a named entity reference.
static ENTITY_OR_CDATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!\[CDATA\[.*?\]\]>|&([a-zA-Z][a-zA-Z0-9]*);").expect("invalid entity regex")
});

/// Replace named HTML entities with the characters they denote.
///
/// Every HTML5 named entity is resolved. Characters that are markup in XML
/// (`&LT;`, `&AMP;`) come back as XML entities. Unknown names and XML
/// entities are left as written so the XML parser can decide what to do
/// with them.
pub fn convert_html_entities(html: &str) -> String {
    if !html.contains('&') {
        return html.to_owned();
    }
    ENTITY_OR_CDATA
        .replace_all(html, |caps: &regex::Captures| {
            let Some(name) = caps.get(1).map(|m| m.as_str()) else {
                return caps[0].to_owned();
            };
            if resolve_xml_entity(name).is_some() {
                return caps[0].to_owned();
            }
            resolve_html5_entity(name)
                .map_or_else(|| caps[0].to_owned(), |text| escape(text).into_owned())
        })
        .into_owned()
}
