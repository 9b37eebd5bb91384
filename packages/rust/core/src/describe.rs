//! Short-form meta description generator.

use tracing::{instrument, warn};

use seostudio_shared::Result;

use crate::model::TextModel;
use crate::prompts;

/// Hard upper bound on a description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 160;

const ELLIPSIS: &str = "...";

/// Generate a meta description. Failures come back as an `Error: ...` string.
#[instrument(skip_all, fields(title = %title))]
pub async fn describe(
    title: &str,
    keywords: &str,
    old_description: &str,
    model: &dyn TextModel,
) -> String {
    match try_describe(title, keywords, old_description, model).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "description generation failed");
            e.to_marker()
        }
    }
}

async fn try_describe(
    title: &str,
    keywords: &str,
    old_description: &str,
    model: &dyn TextModel,
) -> Result<String> {
    let reply = model
        .generate(&prompts::describe_prompt(title, keywords, old_description))
        .await?;
    Ok(clamp_description(reply.trim()))
}

/// Text over the limit becomes its first 157 characters plus `...`.
pub fn clamp_description(text: &str) -> String {
    if text.chars().count() <= MAX_DESCRIPTION_CHARS {
        return text.to_string();
    }
    let keep = MAX_DESCRIPTION_CHARS - ELLIPSIS.len();
    let mut clamped: String = text.chars().take(keep).collect();
    clamped.push_str(ELLIPSIS);
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedModel;
    use seostudio_shared::{SeoStudioError, is_error_marker};

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(clamp_description("Купить диван недорого."), "Купить диван недорого.");
        let exact = "д".repeat(MAX_DESCRIPTION_CHARS);
        assert_eq!(clamp_description(&exact), exact);
    }

    #[test]
    fn long_text_is_clamped_to_exactly_160_chars() {
        let long = "д".repeat(200);
        let clamped = clamp_description(&long);
        assert_eq!(clamped.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(clamped.ends_with("..."));
        assert!(clamped.starts_with(&"д".repeat(157)));
    }

    #[tokio::test]
    async fn describe_trims_and_clamps_model_output() {
        let raw = format!("  {}  ", "ы".repeat(161));
        let model = ScriptedModel::ok(&[raw.as_str()]);
        let out = describe("Диваны", "купить диван", "Старое", &model).await;
        assert_eq!(out.chars().count(), 160);
        assert!(out.ends_with("..."));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn describe_failure_degrades_to_marker() {
        let model = ScriptedModel::new(vec![Err(SeoStudioError::Generation("429".into()))]);
        let out = describe("Диваны", "купить диван", "", &model).await;
        assert!(is_error_marker(&out));
    }
}
