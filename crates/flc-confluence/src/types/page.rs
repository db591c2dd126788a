//! Wiki page types.

use serde::{Deserialize, Serialize};

/// Wiki page as returned by the content API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page {
    /// Page ID.
    pub id: String,
    /// Content type ("page").
    #[serde(rename = "type", default = "default_content_type")]
    pub content_type: String,
    /// Page title.
    pub title: String,
    /// Version information.
    pub version: Version,
    /// Page body content.
    #[serde(default)]
    pub body: Option<Body>,
    /// Hypermedia links.
    #[serde(rename = "_links", default)]
    pub links: Option<Links>,
}

fn default_content_type() -> String {
    "page".to_owned()
}

impl Page {
    /// Storage-format body, empty when the body was not expanded.
    #[must_use]
    pub fn body_html(&self) -> &str {
        self.body
            .as_ref()
            .and_then(|b| b.storage.as_ref())
            .map_or("", |s| s.value.as_str())
    }

    /// Browser URL of the page: server base joined with the web UI path.
    #[must_use]
    pub fn web_url(&self) -> Option<String> {
        let links = self.links.as_ref()?;
        let webui = links.webui.as_deref()?;
        match links.base.as_deref() {
            Some(base) => Some(format!("{}{webui}", base.trim_end_matches('/'))),
            None => Some(webui.to_owned()),
        }
    }
}

/// Page version.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Version {
    /// Version number.
    pub number: u32,
    /// Version message.
    #[serde(default)]
    pub message: Option<String>,
    /// Whether watchers were spared a notification.
    #[serde(rename = "minorEdit", default)]
    pub minor_edit: bool,
}

/// Page body content.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Body {
    /// Storage format content.
    #[serde(default)]
    pub storage: Option<Storage>,
}

impl Body {
    /// Body holding storage-format markup.
    #[must_use]
    pub fn storage(value: impl Into<String>) -> Self {
        Self {
            storage: Some(Storage {
                value: value.into(),
                representation: "storage".to_owned(),
            }),
        }
    }
}

/// Storage format representation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Storage {
    /// XHTML content in storage format.
    pub value: String,
    /// Content representation ("storage").
    pub representation: String,
}

/// Hypermedia links.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Links {
    /// Server base URL.
    #[serde(default)]
    pub base: Option<String>,
    /// Web UI path.
    #[serde(default)]
    pub webui: Option<String>,
    /// API self link.
    #[serde(rename = "self", default)]
    pub self_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_deserialize_expanded_page() {
        let page: Page = serde_json::from_str(
            r#"{
                "id": "42",
                "type": "page",
                "title": "Guide",
                "version": {"number": 7, "minorEdit": true},
                "body": {"storage": {"value": "<p>Hi</p>", "representation": "storage"}},
                "_links": {
                    "base": "https://wiki.example.com/",
                    "webui": "/display/DOC/Guide",
                    "self": "https://wiki.example.com/rest/api/content/42"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(page.version.number, 7);
        assert!(page.version.minor_edit);
        assert_eq!(page.body_html(), "<p>Hi</p>");
        assert_eq!(
            page.web_url().as_deref(),
            Some("https://wiki.example.com/display/DOC/Guide")
        );
    }

    #[test]
    fn test_deserialize_minimal_page() {
        let page: Page =
            serde_json::from_str(r#"{"id": "1", "title": "T", "version": {"number": 1}}"#).unwrap();

        assert_eq!(page.content_type, "page");
        assert_eq!(page.body_html(), "");
        assert_eq!(page.web_url(), None);
    }

    #[test]
    fn test_body_storage_serializes() {
        let json = serde_json::to_value(Body::storage("<p>x</p>")).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"storage": {"value": "<p>x</p>", "representation": "storage"}})
        );
    }
}
