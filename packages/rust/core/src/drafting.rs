//! Drafting agent: first-pass long-form copy from a page brief.

use tracing::instrument;

use seostudio_shared::{PageBrief, Result};

use crate::model::TextModel;
use crate::prompts;

/// One model round-trip; the reply is trimmed.
#[instrument(skip_all, fields(link = %brief.link))]
pub(crate) async fn try_draft(brief: &PageBrief, model: &dyn TextModel) -> Result<String> {
    let reply = model.generate(&prompts::draft_prompt(brief)).await?;
    Ok(reply.trim().to_string())
}

/// Draft copy for a page. Failures come back as an `Error: ...` string.
pub async fn draft(brief: &PageBrief, model: &dyn TextModel) -> String {
    try_draft(brief, model)
        .await
        .unwrap_or_else(|e| e.to_marker())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedModel;
    use seostudio_shared::{SeoStudioError, is_error_marker};

    fn brief() -> PageBrief {
        PageBrief {
            title: "Диваны".into(),
            link: "https://site.ru/divany".into(),
            keywords: "купить диван".into(),
            prior_description: "Старое".into(),
            page_context: "Контент недоступен".into(),
        }
    }

    #[tokio::test]
    async fn draft_trims_reply() {
        let model = ScriptedModel::ok(&["\n  Текст про **диваны**.  \n"]);
        assert_eq!(draft(&brief(), &model).await, "Текст про **диваны**.");
        assert!(model.prompt(0).contains("Контент недоступен"));
    }

    #[tokio::test]
    async fn draft_failure_degrades_to_marker() {
        let model = ScriptedModel::new(vec![Err(SeoStudioError::Generation("boom".into()))]);
        let text = draft(&brief(), &model).await;
        assert!(is_error_marker(&text));
        assert!(text.contains("boom"));
    }
}
