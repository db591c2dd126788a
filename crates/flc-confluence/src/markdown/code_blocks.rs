//! Fenced code blocks rendered as Confluence `code` macros.

use std::fmt::Write as _;
use std::sync::LazyLock;

use flc_config::CodeBlocksConfig;
use regex::{Captures, Regex};

use crate::markup::escape_xml;

/// Fence language to `code` macro language.
const LANGUAGES: &[(&str, &str)] = &[
    ("actionscript", "actionscript3"),
    ("applescript", "applescript"),
    ("bash", "bash"),
    ("c", "c"),
    ("c#", "c#"),
    ("coldfusion", "coldfusion"),
    ("cpp", "cpp"),
    ("cs", "c#"),
    ("css", "css"),
    ("delphi", "delphi"),
    ("diff", "diff"),
    ("erlang", "erl"),
    ("groovy", "groovy"),
    ("html", "html"),
    ("java", "java"),
    ("javascript", "javascript"),
    ("js", "js"),
    ("perl", "perl"),
    ("php", "php"),
    ("powershell", "powershell"),
    ("python", "py"),
    ("xml", "xml"),
    ("yaml", "yml"),
];

/// Themes the `code` macro accepts.
pub const THEMES: &[&str] = &[
    "emacs",
    "django",
    "fadetogrey",
    "midnight",
    "rdark",
    "eclipse",
    "confluence",
];

/// Fenced block with ``` or ~~~, optional language after the opening fence.
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<lead>^|\n)(?:",
        r"```(?:[ \t]*(?P<lang1>[\w#+-]+)[ \t]*)?\n(?P<body1>[\s\S]+?)```",
        r"|",
        r"~~~(?:[ \t]*(?P<lang2>[\w#+-]+)[ \t]*)?\n(?P<body2>[\s\S]+?)~~~",
        r")",
    ))
    .expect("invalid fence regex")
});

/// Options of one generated `code` macro.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodeMacro<'a> {
    /// Fence language, mapped through the language table.
    pub language: Option<&'a str>,
    /// Color theme, dropped unless listed in [`THEMES`].
    pub theme: Option<&'a str>,
    /// Panel title.
    pub title: Option<&'a str>,
    /// Show line numbers.
    pub linenumbers: bool,
    /// Collapse the block by default.
    pub collapse: bool,
}

impl CodeMacro<'_> {
    /// Render the macro around `source`, wrapped in a raw block.
    #[must_use]
    pub fn render(&self, source: &str) -> String {
        let mut out =
            String::from(r#"<raw_confluence><p><ac:structured-macro ac:name="code" ac:schema-version="1">"#);
        out.push('\n');

        if let Some(language) = self.language.and_then(map_language) {
            let _ = writeln!(out, r#"  <ac:parameter ac:name="language">{language}</ac:parameter>"#);
        }
        if let Some(theme) = self.theme.map(str::to_lowercase)
            && THEMES.contains(&theme.as_str())
        {
            let _ = writeln!(out, r#"  <ac:parameter ac:name="theme">{theme}</ac:parameter>"#);
        }
        if let Some(title) = self.title {
            let _ = writeln!(
                out,
                r#"  <ac:parameter ac:name="title">{}</ac:parameter>"#,
                escape_xml(title, false)
            );
        }
        if self.linenumbers {
            out.push_str("  <ac:parameter ac:name=\"linenumbers\">true</ac:parameter>\n");
        }
        if self.collapse {
            out.push_str("  <ac:parameter ac:name=\"collapse\">true</ac:parameter>\n");
        }

        let _ = writeln!(
            out,
            "<ac:plain-text-body><![CDATA[{}]]></ac:plain-text-body>",
            source.replace("]]>", "]]]]><![CDATA[>")
        );
        out.push_str("</ac:structured-macro></p></raw_confluence>");
        out
    }
}

/// Replace fenced code blocks with `code` macros.
///
/// A line break preceding the fence is kept, as is everything outside the
/// fences. The final newline of each block body is dropped.
#[must_use]
pub fn process_code_blocks(source: &str, config: &CodeBlocksConfig) -> String {
    FENCE_RE
        .replace_all(source, |caps: &Captures<'_>| {
            let language = caps.name("lang1").or_else(|| caps.name("lang2")).map(|m| m.as_str());
            let body = caps
                .name("body1")
                .or_else(|| caps.name("body2"))
                .map_or("", |m| m.as_str());
            let body = body.strip_suffix('\n').unwrap_or(body);
            tracing::debug!(language = ?language, len = body.len(), "Found code block");

            let code = CodeMacro {
                language,
                theme: config.theme.as_deref(),
                title: config.title.as_deref(),
                linenumbers: config.linenumbers,
                collapse: config.collapse,
            };
            format!("{}{}", &caps["lead"], code.render(body))
        })
        .into_owned()
}

fn map_language(language: &str) -> Option<&'static str> {
    let language = language.to_lowercase();
    LANGUAGES
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, mapped)| *mapped)
}
