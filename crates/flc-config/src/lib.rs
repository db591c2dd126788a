//! Configuration management for the Confluence publisher.
//!
//! Parses `flc.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `confluence.base_url`
//! - `confluence.space_key`
//! - `page.id`
//! - `page.space_key`
//! - `page.title`
//! - `page.parent_id`
//! - `page.parent_title`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "flc.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Confluence server configuration.
    pub confluence: Option<ConfluenceConfig>,
    /// Target page.
    pub page: PageConfig,
    /// Publishing switches.
    pub publish: PublishConfig,
    /// Markup constants shared by extraction and comment restoration.
    pub markup: MarkupConfig,
    /// Comment placement tuning.
    pub reconcile: ReconcileConfig,
    /// Defaults for generated code macros.
    pub codeblocks: CodeBlocksConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Confluence server configuration.
#[derive(Debug, Deserialize)]
pub struct ConfluenceConfig {
    /// Confluence server base URL.
    pub base_url: String,
    /// Default space key for pages addressed by title.
    #[serde(default)]
    pub space_key: Option<String>,
}

impl ConfluenceConfig {
    /// Validate that all required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the base URL is empty or not http(s).
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.base_url, "confluence.base_url")?;
        require_http_url(&self.base_url, "confluence.base_url")?;
        Ok(())
    }
}

/// Page addressing: either by id, or by space key and title.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Existing page id. Takes precedence over space key and title.
    pub id: Option<String>,
    /// Space key of the page.
    pub space_key: Option<String>,
    /// Page title.
    pub title: Option<String>,
    /// Parent page id for newly created pages.
    pub parent_id: Option<String>,
    /// Parent page title, looked up in the page's space. Ignored when
    /// `parent_id` is set.
    pub parent_title: Option<String>,
}

impl PageConfig {
    /// Validate that the page can be addressed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` when neither `id` nor both
    /// `space_key` and `title` are given.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.as_deref().is_some_and(|id| !id.is_empty()) {
            return Ok(());
        }
        match (self.space_key.as_deref(), self.title.as_deref()) {
            (Some(space), Some(title)) if !space.is_empty() && !title.is_empty() => Ok(()),
            _ => Err(ConfigError::Validation(
                "page requires either id, or both space_key and title".to_owned(),
            )),
        }
    }
}

/// Publishing switches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PublishConfig {
    /// Re-attach inline comments from the current page version.
    pub restore_comments: bool,
    /// Only re-attach comments whose text did not change.
    pub resolve_if_changed: bool,
    /// Prepend a table of contents macro.
    pub toc: bool,
    /// Drop the first heading of the document.
    pub nohead: bool,
    /// Notify page watchers (a non-minor edit).
    pub notify_watchers: bool,
    /// Prepare everything but do not write to the wiki.
    pub test_run: bool,
    /// Confluence Cloud: strip formatting whitespace from text nodes.
    pub cloud: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            restore_comments: true,
            resolve_if_changed: false,
            toc: false,
            nohead: false,
            notify_watchers: false,
            test_run: false,
            cloud: false,
        }
    }
}

/// Markup constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    /// Anchor names opening the managed region. The first one is written.
    pub open_markers: Vec<String>,
    /// Anchor names closing the managed region. The first one is written.
    pub close_markers: Vec<String>,
    /// Inline comment marker element name.
    pub comment_tag: String,
    /// Attribute of the comment marker holding the comment reference id.
    pub comment_ref_attr: String,
    /// Tag prefix of embedded macro markup that cannot carry comments.
    pub macro_prefix: String,
    /// Page property holding the content fingerprint.
    pub hash_property_key: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            open_markers: vec!["foliant_start".to_owned(), "foliant".to_owned()],
            close_markers: vec![
                "foliant_end".to_owned(),
                "foliant_finish".to_owned(),
                "foliant_close".to_owned(),
            ],
            comment_tag: "ac:inline-comment-marker".to_owned(),
            comment_ref_attr: "ac:ref".to_owned(),
            macro_prefix: "ac:".to_owned(),
            hash_property_key: "foliant_hash".to_owned(),
        }
    }
}

impl MarkupConfig {
    /// Anchor name written at the start of the managed region.
    #[must_use]
    pub fn open_marker(&self) -> &str {
        self.open_markers.first().map_or("foliant_start", String::as_str)
    }

    /// Anchor name written at the end of the managed region.
    #[must_use]
    pub fn close_marker(&self) -> &str {
        self.close_markers.first().map_or("foliant_end", String::as_str)
    }

    /// Validate markup constants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if a name list or tag is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.open_markers.is_empty() {
            return Err(ConfigError::Validation(
                "markup.open_markers cannot be empty".to_owned(),
            ));
        }
        if self.close_markers.is_empty() {
            return Err(ConfigError::Validation(
                "markup.close_markers cannot be empty".to_owned(),
            ));
        }
        require_non_empty(&self.comment_tag, "markup.comment_tag")?;
        require_non_empty(&self.comment_ref_attr, "markup.comment_ref_attr")?;
        require_non_empty(&self.macro_prefix, "markup.macro_prefix")?;
        require_non_empty(&self.hash_property_key, "markup.hash_property_key")?;
        Ok(())
    }
}

/// Comment placement tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Text runs taken on each side of a pure deletion when guessing a
    /// placement for a comment whose text is gone.
    pub delete_fallback_radius: usize,
    /// How many runs a placement boundary may move to leave macro markup.
    pub boundary_scan_window: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            delete_fallback_radius: 1,
            boundary_scan_window: 16,
        }
    }
}

/// Defaults for generated code macros.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CodeBlocksConfig {
    /// Color theme name.
    pub theme: Option<String>,
    /// Macro title.
    pub title: Option<String>,
    /// Show line numbers.
    pub linenumbers: bool,
    /// Collapse the block by default.
    pub collapse: bool,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`page.title`").
        field: String,
        /// Error message (e.g., "${`PAGE_TITLE`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `flc.toml` in current directory and parents,
    /// falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }
        match Self::discover_config() {
            Some(discovered) => Self::load_from_file(&discovered),
            None => Ok(Self::default()),
        }
    }

    /// Get validated Confluence configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_confluence(&self) -> Result<&ConfluenceConfig, ConfigError> {
        let conf = self.confluence.as_ref().ok_or_else(|| {
            ConfigError::Validation("[confluence] section required in config".into())
        })?;
        conf.validate()?;
        Ok(conf)
    }

    /// Page configuration with the Confluence default space applied.
    #[must_use]
    pub fn resolved_page(&self) -> PageConfig {
        let mut page = self.page.clone();
        if page.space_key.is_none() {
            page.space_key = self
                .confluence
                .as_ref()
                .and_then(|c| c.space_key.clone());
        }
        page
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(confluence) = &self.confluence {
            confluence.validate()?;
        }
        self.resolved_page().validate()?;
        self.markup.validate()?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref mut confluence) = self.confluence {
            confluence.base_url = expand::expand_env(&confluence.base_url, "confluence.base_url")?;
            expand_optional(&mut confluence.space_key, "confluence.space_key")?;
        }

        expand_optional(&mut self.page.id, "page.id")?;
        expand_optional(&mut self.page.space_key, "page.space_key")?;
        expand_optional(&mut self.page.title, "page.title")?;
        expand_optional(&mut self.page.parent_id, "page.parent_id")?;
        expand_optional(&mut self.page.parent_title, "page.parent_title")?;

        Ok(())
    }
}

fn expand_optional(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    if let Some(v) = value.as_deref() {
        *value = Some(expand::expand_env(v, field)?);
    }
    Ok(())
}
