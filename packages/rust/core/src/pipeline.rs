//! Batch actions over a project table: crawl, describe, write.
//!
//! Rows are processed strictly one at a time. Each action checks the shared
//! cancel flag between rows, never inside a model call, so a stop request
//! leaves every finished row persisted.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use url::Url;

use seostudio_crawler::PageFetcher;
use seostudio_shared::{PageBrief, PageRow, ProjectId, Result, RowUpdate, is_error_marker};
use seostudio_storage::Storage;

use crate::describe::describe;
use crate::model::TextModel;
use crate::multi_agent::write_page_text;
use crate::refine::RefineOptions;

/// Page context used when the live page yields no text.
pub const CONTEXT_PLACEHOLDER: &str = "Контент недоступен";

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a row or page is processed.
    fn item(&self, label: &str, current: usize, total: usize);
    /// Called when a row's generation failed.
    fn item_failed(&self, label: &str, error: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _label: &str, _current: usize, _total: usize) {}
    fn item_failed(&self, _label: &str, _error: &str) {}
}

// ---------------------------------------------------------------------------
// Page context
// ---------------------------------------------------------------------------

/// Supplies truncated body text for a page. Failures yield an empty string.
pub trait ContextSource: Send + Sync {
    fn page_context<'a>(
        &'a self,
        url: &'a str,
        max_chars: usize,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>>;
}

impl ContextSource for PageFetcher {
    fn page_context<'a>(
        &'a self,
        url: &'a str,
        max_chars: usize,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
        Box::pin(self.fetch_content(url, max_chars))
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Result of [`crawl_into_project`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Links found on the source page.
    pub discovered: usize,
    /// Links not already in the project.
    pub new_links: usize,
    /// Rows appended.
    pub appended: usize,
    /// New links whose metadata could not be fetched.
    pub unreachable: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// A row whose generation came back as an error marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub index: usize,
    pub link: String,
    pub error: String,
}

/// Result of [`describe_rows`] and [`write_rows`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Rows chosen for processing.
    pub targeted: usize,
    /// Rows written.
    pub succeeded: usize,
    pub failures: Vec<RowFailure>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Rows actually attempted.
    pub fn processed(&self) -> usize {
        self.succeeded + self.failures.len()
    }
}

// ---------------------------------------------------------------------------
// Targeting
// ---------------------------------------------------------------------------

/// Indices a generation action works on: the selected rows, or when nothing is
/// selected, the rows whose output cell is still empty.
pub fn select_targets(rows: &[PageRow], output: impl Fn(&PageRow) -> &str) -> Vec<usize> {
    let selected: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.selected)
        .map(|(i, _)| i)
        .collect();
    if !selected.is_empty() {
        return selected;
    }

    rows.iter()
        .enumerate()
        .filter(|(_, row)| output(row).trim().is_empty())
        .map(|(i, _)| i)
        .collect()
}

fn cancelled(cancel: &AtomicBool) -> bool {
    cancel.load(Ordering::Relaxed)
}

// ---------------------------------------------------------------------------
// Crawl
// ---------------------------------------------------------------------------

/// Discover links on `source`, fetch metadata for the ones not yet in the
/// project, and append them in batches of `batch_size`.
#[instrument(skip_all, fields(project = %project, source = %source))]
pub async fn crawl_into_project(
    storage: &Storage,
    fetcher: &PageFetcher,
    project: &ProjectId,
    source: &Url,
    batch_size: usize,
    cancel: &AtomicBool,
    progress: &dyn ProgressReporter,
) -> Result<CrawlSummary> {
    let start = Instant::now();
    let batch_size = batch_size.max(1);

    progress.phase("Discovering links");
    let links = fetcher.discover_links(source).await?;

    let existing: HashSet<String> = storage
        .load_rows(project)
        .await?
        .into_iter()
        .map(|row| row.link)
        .collect();
    let fresh: Vec<String> = links
        .iter()
        .filter(|link| !existing.contains(*link))
        .cloned()
        .collect();

    let mut summary = CrawlSummary {
        discovered: links.len(),
        new_links: fresh.len(),
        ..Default::default()
    };
    info!(
        discovered = summary.discovered,
        new_links = summary.new_links,
        "links discovered"
    );

    progress.phase("Fetching page metadata");
    let mut batch: Vec<PageRow> = Vec::with_capacity(batch_size);
    let total = fresh.len();

    for (i, link) in fresh.iter().enumerate() {
        if cancelled(cancel) {
            summary.cancelled = true;
            break;
        }
        progress.item(link, i + 1, total);

        match fetcher.fetch_metadata(link).await {
            Some(meta) => batch.push(PageRow::from_metadata(meta)),
            None => {
                warn!(url = %link, "metadata unavailable, skipping");
                summary.unreachable += 1;
            }
        }

        if batch.len() >= batch_size {
            summary.appended += storage.append_rows(project, &batch).await?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        summary.appended += storage.append_rows(project, &batch).await?;
    }

    summary.elapsed = start.elapsed();
    info!(
        appended = summary.appended,
        unreachable = summary.unreachable,
        cancelled = summary.cancelled,
        "crawl finished"
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Generation actions
// ---------------------------------------------------------------------------

/// Options for [`write_rows`].
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub refine: RefineOptions,
    /// Characters of page body text fed to the drafting agent.
    pub context_chars: usize,
}

/// Generate meta descriptions for the targeted rows.
///
/// Each success is written to `new_description` and the row is unselected.
/// Failed rows are left as they were so the next run picks them up again.
#[instrument(skip_all, fields(project = %project))]
pub async fn describe_rows(
    storage: &Storage,
    project: &ProjectId,
    model: &dyn TextModel,
    cancel: &AtomicBool,
    progress: &dyn ProgressReporter,
) -> Result<BatchSummary> {
    let start = Instant::now();
    let rows = storage.load_rows(project).await?;
    let targets = select_targets(&rows, |row| row.new_description.as_str());

    progress.phase("Generating descriptions");
    let mut summary = BatchSummary {
        targeted: targets.len(),
        ..Default::default()
    };

    for (n, &index) in targets.iter().enumerate() {
        if cancelled(cancel) {
            summary.cancelled = true;
            break;
        }
        let row = &rows[index];
        progress.item(&row.link, n + 1, targets.len());

        let description = describe(&row.title, &row.keywords, &row.description, model).await;
        record(
            storage,
            project,
            index,
            row,
            description,
            |text| RowUpdate {
                selected: Some(false),
                new_description: Some(text),
                ..Default::default()
            },
            &mut summary,
            progress,
        )
        .await?;
    }

    summary.elapsed = start.elapsed();
    log_summary("describe", &summary);
    Ok(summary)
}

/// Generate long-form page text for the targeted rows.
///
/// Page context comes from `context`; an empty result is replaced by
/// [`CONTEXT_PLACEHOLDER`]. Successes go to `text` and the row is unselected.
#[instrument(skip_all, fields(project = %project))]
pub async fn write_rows(
    storage: &Storage,
    context: &dyn ContextSource,
    project: &ProjectId,
    model: &dyn TextModel,
    options: &WriteOptions,
    cancel: &AtomicBool,
    progress: &dyn ProgressReporter,
) -> Result<BatchSummary> {
    let start = Instant::now();
    let rows = storage.load_rows(project).await?;
    let targets = select_targets(&rows, |row| row.text.as_str());

    progress.phase("Writing page text");
    let mut summary = BatchSummary {
        targeted: targets.len(),
        ..Default::default()
    };

    for (n, &index) in targets.iter().enumerate() {
        if cancelled(cancel) {
            summary.cancelled = true;
            break;
        }
        let row = &rows[index];
        progress.item(&row.link, n + 1, targets.len());

        let mut page_context = context.page_context(&row.link, options.context_chars).await;
        if page_context.trim().is_empty() {
            page_context = CONTEXT_PLACEHOLDER.to_string();
        }
        let brief = PageBrief::from_row(row, page_context);

        let text = write_page_text(&brief, model, &options.refine).await;
        record(
            storage,
            project,
            index,
            row,
            text,
            |text| RowUpdate {
                selected: Some(false),
                text: Some(text),
                ..Default::default()
            },
            &mut summary,
            progress,
        )
        .await?;
    }

    summary.elapsed = start.elapsed();
    log_summary("write", &summary);
    Ok(summary)
}

/// Persist one generated value, or count it as a failure.
#[allow(clippy::too_many_arguments)]
async fn record(
    storage: &Storage,
    project: &ProjectId,
    index: usize,
    row: &PageRow,
    generated: String,
    update: impl FnOnce(String) -> RowUpdate,
    summary: &mut BatchSummary,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    if is_error_marker(&generated) {
        warn!(index, url = %row.link, error = %generated, "generation failed");
        progress.item_failed(&row.link, &generated);
        summary.failures.push(RowFailure {
            index,
            link: row.link.clone(),
            error: generated,
        });
        return Ok(());
    }

    storage.update_row(project, index, &update(generated)).await?;
    summary.succeeded += 1;
    Ok(())
}

fn log_summary(action: &str, summary: &BatchSummary) {
    info!(
        action,
        targeted = summary.targeted,
        succeeded = summary.succeeded,
        failed = summary.failures.len(),
        cancelled = summary.cancelled,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "batch finished"
    );
}
