//! Critique → revision loop over a single candidate text.

use tracing::{debug, info, instrument};

use seostudio_shared::{PageBrief, PipelineConfig, Result, ScoreParsing};

use crate::critique::CritiqueResult;
use crate::model::TextModel;
use crate::prompts;

/// Default iteration cap.
pub const MAX_ITERATIONS: usize = 3;

/// Knobs for [`refine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefineOptions {
    /// Upper bound on critique calls (and on revision calls).
    pub max_iterations: usize,
    pub score_parsing: ScoreParsing,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            score_parsing: ScoreParsing::Lenient,
        }
    }
}

impl From<&PipelineConfig> for RefineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_iterations: config.max_iterations as usize,
            score_parsing: config.score_parsing,
        }
    }
}

/// Outcome of a refinement run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refined {
    /// The last candidate.
    pub text: String,
    /// Critique calls made.
    pub critiques: usize,
    /// Revision calls made.
    pub revisions: usize,
    /// Whether the loop exited on a perfect score.
    pub converged: bool,
}

/// Iteratively critique and revise `initial` until every score is perfect or
/// the iteration cap is hit. The last candidate always wins.
///
/// Generation failures propagate; the caller decides how to degrade them.
#[instrument(skip_all, fields(link = %brief.link, max_iterations = options.max_iterations))]
pub async fn refine(
    initial: String,
    brief: &PageBrief,
    model: &dyn TextModel,
    options: &RefineOptions,
) -> Result<Refined> {
    let mut refined = Refined {
        text: initial,
        critiques: 0,
        revisions: 0,
        converged: false,
    };

    for iteration in 1..=options.max_iterations {
        let reply = model
            .generate(&prompts::critique_prompt(&refined.text, &brief.keywords))
            .await?;
        refined.critiques += 1;

        let critique = CritiqueResult::parse(&reply, options.score_parsing);
        debug!(
            iteration,
            scores = ?critique.scores,
            malformed = critique.is_malformed(),
            "critique parsed"
        );

        if critique.is_perfect() {
            refined.converged = true;
            break;
        }

        let revised = model
            .generate(&prompts::revision_prompt(&refined.text, &critique.feedback))
            .await?;
        refined.text = revised.trim().to_string();
        refined.revisions += 1;
    }

    info!(
        critiques = refined.critiques,
        revisions = refined.revisions,
        converged = refined.converged,
        "refinement finished"
    );
    Ok(refined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedModel;
    use seostudio_shared::SeoStudioError;

    fn brief() -> PageBrief {
        PageBrief {
            title: "Диваны".into(),
            link: "https://site.ru/divany".into(),
            keywords: "купить диван".into(),
            prior_description: String::new(),
            page_context: String::new(),
        }
    }

    const PERFECT: &str = "SCORES: [10, 10, 10, 10]\nFEEDBACK: none";
    const WEAK: &str = "SCORES: [7, 8, 6, 9]\nFEEDBACK: too generic";

    #[tokio::test]
    async fn perfect_first_critique_returns_candidate_unmodified() {
        let model = ScriptedModel::ok(&[PERFECT]);
        let out = refine("черновик".into(), &brief(), &model, &RefineOptions::default())
            .await
            .unwrap();

        assert_eq!(out.text, "черновик");
        assert_eq!(out.critiques, 1);
        assert_eq!(out.revisions, 0);
        assert!(out.converged);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn weak_critique_triggers_exactly_one_revision_before_next_critique() {
        let model = ScriptedModel::ok(&[WEAK, "  вторая версия \n", PERFECT]);
        let out = refine("черновик".into(), &brief(), &model, &RefineOptions::default())
            .await
            .unwrap();

        assert_eq!(out.text, "вторая версия");
        assert_eq!((out.critiques, out.revisions), (2, 1));
        assert_eq!(model.calls(), 3);
        assert!(model.prompt(1).contains("too generic"));
        assert!(model.prompt(1).contains("черновик"));
        assert!(model.prompt(2).contains("вторая версия"));
    }

    #[tokio::test]
    async fn never_perfect_stops_at_cap_with_last_candidate() {
        let model = ScriptedModel::ok(&[WEAK, "v1", WEAK, "v2", WEAK, "v3", PERFECT]);
        let out = refine("v0".into(), &brief(), &model, &RefineOptions::default())
            .await
            .unwrap();

        assert_eq!(out.text, "v3");
        assert_eq!((out.critiques, out.revisions), (3, 3));
        assert!(!out.converged);
        assert_eq!(model.calls(), 6);
    }

    #[tokio::test]
    async fn malformed_critique_is_not_perfect() {
        let model = ScriptedModel::ok(&["Все хорошо", "v1", PERFECT]);
        let out = refine("v0".into(), &brief(), &model, &RefineOptions::default())
            .await
            .unwrap();

        assert_eq!(out.text, "v1");
        assert_eq!(out.revisions, 1);
    }

    #[tokio::test]
    async fn strict_parsing_ignores_stray_numbers() {
        let options = RefineOptions {
            score_parsing: ScoreParsing::Strict,
            ..Default::default()
        };
        let model = ScriptedModel::ok(&["10 10 10 10", "v1", PERFECT]);
        let out = refine("v0".into(), &brief(), &model, &options).await.unwrap();
        assert_eq!(out.text, "v1");
        assert_eq!(out.critiques, 2);
    }

    #[tokio::test]
    async fn generation_failure_propagates() {
        let model = ScriptedModel::new(vec![
            Ok(WEAK.to_string()),
            Err(SeoStudioError::Generation("quota".into())),
        ]);
        let err = refine("v0".into(), &brief(), &model, &RefineOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SeoStudioError::Generation(_)));
    }

    #[test]
    fn options_from_pipeline_config() {
        let config = PipelineConfig {
            max_iterations: 5,
            score_parsing: ScoreParsing::Strict,
        };
        let options = RefineOptions::from(&config);
        assert_eq!(options.max_iterations, 5);
        assert_eq!(options.score_parsing, ScoreParsing::Strict);
    }
}
