//! Long-form page copy: draft → refine → humanize.

use tracing::{info, instrument, warn};

use seostudio_shared::{PageBrief, Result};

use crate::drafting::try_draft;
use crate::model::TextModel;
use crate::refine::{RefineOptions, refine};

/// Produce finished page text for one brief.
///
/// The humanizer runs exactly once, after the loop. Any generation failure is
/// returned as an `Error: ...` string instead of text.
#[instrument(skip_all, fields(link = %brief.link, model = model.model_id()))]
pub async fn write_page_text(
    brief: &PageBrief,
    model: &dyn TextModel,
    options: &RefineOptions,
) -> String {
    match run(brief, model, options).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "multi-agent generation failed");
            e.to_marker()
        }
    }
}

async fn run(brief: &PageBrief, model: &dyn TextModel, options: &RefineOptions) -> Result<String> {
    let initial = try_draft(brief, model).await?;
    let refined = refine(initial, brief, model, options).await?;
    let text = seostudio_humanizer::humanize(&refined.text);
    info!(chars = text.chars().count(), "page text ready");
    Ok(text)
}
