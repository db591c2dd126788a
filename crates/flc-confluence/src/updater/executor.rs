//! Page updater implementation.

use flc_config::{Config, ConfigError, PageConfig};
use tempfile::TempDir;

use crate::comment_preservation::{ReconcileContext, UnmatchedComment, restore_comments};
use crate::convert::MarkdownConverter;
use crate::error::WikiError;
use crate::fingerprint::{content_fingerprint, needs_update};
use crate::markdown;
use crate::postprocess::{add_toc, unformat};
use crate::region::PageRegions;
use crate::types::Page;
use crate::wiki::{NewPage, PageTarget, WikiApi};

use super::error::UpdateError;
use super::result::{DryRunResult, UpdateResult};

/// Publishes Markdown documents to wiki pages.
pub struct PageUpdater<'a, W, C> {
    wiki: &'a W,
    converter: &'a C,
    config: &'a Config,
}

/// Everything known before writing.
struct Plan {
    page: Option<Page>,
    title: String,
    parent_id: Option<String>,
    regions: PageRegions,
    content: String,
    restored: Vec<String>,
    unmatched: Vec<UnmatchedComment>,
    needs_update: bool,
}

impl<'a, W: WikiApi, C: MarkdownConverter> PageUpdater<'a, W, C> {
    /// Create a new page updater.
    #[must_use]
    pub fn new(wiki: &'a W, converter: &'a C, config: &'a Config) -> Self {
        Self {
            wiki,
            converter,
            config,
        }
    }

    /// Publish `markdown` to the configured page.
    ///
    /// This method:
    /// 1. Prepares and converts the Markdown
    /// 2. Fetches the current page, creating it later if addressed by title
    /// 3. Restores inline comments of the managed region
    /// 4. Skips the write when the content fingerprint is unchanged
    /// 5. Writes the page body and stores the new fingerprint
    ///
    /// Nothing is written in test runs.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the page configuration is incomplete
    /// - the converter fails
    /// - a page addressed by id does not exist
    /// - the configured parent page cannot be found
    /// - wiki API calls fail
    pub fn update(&self, markdown: &str) -> Result<UpdateResult, UpdateError> {
        let plan = self.plan(markdown)?;
        let test_run = self.config.publish.test_run;

        let page = match (plan.needs_update, test_run) {
            (true, false) => Some(self.write(&plan)?),
            (true, true) => {
                tracing::info!(title = %plan.title, "Test run, page not written");
                plan.page.clone()
            }
            (false, _) => {
                tracing::info!(title = %plan.title, "Page is up to date");
                plan.page.clone()
            }
        };

        Ok(UpdateResult {
            page_id: page.as_ref().map(|p| p.id.clone()),
            url: page.as_ref().and_then(|p| self.page_url(p)),
            title: plan.title,
            updated: plan.needs_update,
            test_run,
            restored_comments: plan.restored,
            unmatched_comments: plan.unmatched,
        })
    }

    /// Perform a dry run (no changes made).
    ///
    /// Returns the body that would be written without touching the page.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update), minus write failures.
    pub fn dry_run(&self, markdown: &str) -> Result<DryRunResult, UpdateError> {
        let plan = self.plan(markdown)?;

        Ok(DryRunResult {
            html: plan.regions.wrap(&plan.content, &self.config.markup),
            current_title: plan.page.as_ref().map(|p| p.title.clone()),
            current_version: plan.page.as_ref().map(|p| p.version.number),
            title: plan.title,
            needs_update: plan.needs_update,
            restored_comments: plan.restored,
            unmatched_comments: plan.unmatched,
        })
    }

    fn plan(&self, markdown: &str) -> Result<Plan, UpdateError> {
        let page_config = self.config.resolved_page();
        page_config.validate()?;

        let html = self.convert(markdown)?;

        let target = page_target(&page_config)?;
        let page = self.wiki.find_page(&target)?;
        if page.is_none()
            && let PageTarget::Id(_) = target
        {
            return Err(WikiError::NotFound(target.to_string()).into());
        }

        let title = page_config
            .title
            .clone()
            .or_else(|| page.as_ref().map(|p| p.title.clone()))
            .ok_or_else(|| ConfigError::Validation("page.title required".to_owned()))?;

        let parent_id = match target {
            PageTarget::Id(_) => None,
            PageTarget::Title { space_key, .. } => self.parent_id(&page_config, space_key)?,
        };

        let mut plan = Plan {
            page: None,
            title,
            parent_id,
            regions: PageRegions::default(),
            content: html,
            restored: Vec::new(),
            unmatched: Vec::new(),
            needs_update: true,
        };
        if let Some(existing) = &page {
            self.reconcile(existing, &mut plan)?;
        }

        if self.config.publish.cloud {
            match unformat(&plan.content) {
                Ok(content) => plan.content = content,
                Err(e) => tracing::warn!(error = %e, "Cannot strip formatting, keeping content"),
            }
        }

        let stored = match &page {
            Some(existing) => self
                .wiki
                .get_property(&existing.id, &self.config.markup.hash_property_key)?,
            None => None,
        };
        plan.needs_update = needs_update(page.is_some(), stored.as_deref(), &plan.content, &plan.title);
        plan.page = page;
        Ok(plan)
    }

    /// Parent of a page addressed by title: `parent_id` when it can be
    /// read, otherwise the page titled `parent_title` in the same space.
    ///
    /// A missing parent title is tolerated in test runs.
    fn parent_id(
        &self,
        page_config: &PageConfig,
        space_key: &str,
    ) -> Result<Option<String>, UpdateError> {
        if let Some(id) = page_config.parent_id.as_deref().filter(|id| !id.is_empty()) {
            let target = PageTarget::Id(id);
            return match self.wiki.find_page(&target)? {
                Some(parent) => Ok(Some(parent.id)),
                None => Err(UpdateError::ParentNotFound(target.to_string())),
            };
        }

        let Some(title) = page_config.parent_title.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let target = PageTarget::Title { space_key, title };
        match self.wiki.find_page(&target)? {
            Some(parent) => {
                tracing::debug!(parent_id = %parent.id, %target, "Found parent page");
                Ok(Some(parent.id))
            }
            None if self.config.publish.test_run => {
                tracing::warn!(%target, "Parent page not found, ignored in test run");
                Ok(None)
            }
            None => Err(UpdateError::ParentNotFound(target.to_string())),
        }
    }

    fn convert(&self, markdown: &str) -> Result<String, UpdateError> {
        let publish = &self.config.publish;
        let prepared = markdown::prepare(markdown, publish, &self.config.codeblocks);

        let workdir = TempDir::new()?;
        let converted = self.converter.convert(&prepared.markdown, workdir.path())?;
        tracing::debug!(len = converted.len(), "Converted markdown");

        let html = prepared.raw.restore(&converted);
        Ok(if publish.toc { add_toc(&html) } else { html })
    }

    /// Split the current body and carry its inline comments over to the
    /// new content.
    fn reconcile(&self, existing: &Page, plan: &mut Plan) -> Result<(), UpdateError> {
        let markup = &self.config.markup;
        let body = existing.body_html();
        plan.regions = PageRegions::extract(body, markup).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Cannot split page body, replacing all of it");
            PageRegions::unmanaged(body.to_owned())
        });

        let publish = &self.config.publish;
        if !publish.restore_comments {
            return Ok(());
        }

        let ctx = ReconcileContext::for_page(self.config, &existing.id);
        let resolved = ctx.span().in_scope(|| {
            let resolved = self.wiki.resolved_comment_ids(&existing.id)?;
            tracing::debug!(count = resolved.len(), "Fetched resolved comments");
            Ok::<_, WikiError>(resolved)
        })?;

        let result = restore_comments(
            &plan.regions.managed,
            &plan.content,
            &resolved,
            publish.resolve_if_changed,
            &ctx,
        );
        for comment in &result.unmatched_comments {
            tracing::warn!(ref_id = %comment.ref_id, text = %comment.text, "Inline comment lost");
        }

        plan.content = result.html;
        plan.restored = result.exact.into_iter().chain(result.approximate).collect();
        plan.unmatched = result.unmatched_comments;
        Ok(())
    }

    fn write(&self, plan: &Plan) -> Result<Page, UpdateError> {
        let markup = &self.config.markup;
        let body = plan.regions.wrap(&plan.content, markup);
        let minor_edit = !self.config.publish.notify_watchers;

        let page = if let Some(existing) = &plan.page {
            tracing::info!(
                page_id = %existing.id,
                version = existing.version.number,
                minor_edit,
                "Updating page"
            );
            self.wiki
                .update_page(existing, &plan.title, &body, minor_edit)?
        } else {
            let page_config = self.config.resolved_page();
            let space_key = page_config.space_key.as_deref().ok_or_else(|| {
                ConfigError::Validation("page.space_key required to create a page".to_owned())
            })?;
            tracing::info!(space_key, title = %plan.title, "Creating page");
            let new_page = NewPage {
                space_key,
                title: &plan.title,
                parent_id: plan.parent_id.as_deref(),
            };
            self.wiki.create_page(&new_page, &body)?
        };

        let hash = content_fingerprint(&plan.content, &plan.title);
        self.wiki
            .set_property(&page.id, &markup.hash_property_key, &hash)?;
        Ok(page)
    }

    fn page_url(&self, page: &Page) -> Option<String> {
        page.web_url().or_else(|| {
            let confluence = self.config.confluence.as_ref()?;
            Some(format!(
                "{}/pages/viewpage.action?pageId={}",
                confluence.base_url.trim_end_matches('/'),
                page.id
            ))
        })
    }
}

fn page_target(page: &PageConfig) -> Result<PageTarget<'_>, ConfigError> {
    if let Some(id) = page.id.as_deref().filter(|id| !id.is_empty()) {
        return Ok(PageTarget::Id(id));
    }
    match (page.space_key.as_deref(), page.title.as_deref()) {
        (Some(space_key), Some(title)) => Ok(PageTarget::Title { space_key, title }),
        _ => Err(ConfigError::Validation(
            "page requires either id, or both space_key and title".to_owned(),
        )),
    }
}
