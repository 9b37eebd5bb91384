//! Critique parsing and the quality gate.

use std::sync::LazyLock;

use regex::Regex;
use seostudio_shared::ScoreParsing;

/// Number of quality dimensions a critique scores.
pub const SCORE_COUNT: usize = 4;

/// Highest score on the 0–10 scale; the gate requires it on every dimension.
pub const MAX_SCORE: u8 = 10;

/// Every standalone integer 0–10.
static SCORE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]|10)\b").expect("valid regex"));

/// The `SCORES: [a, b, c, d]` line.
static SCORES_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*SCORES:\s*\[([^\]\n]*)\]").expect("valid regex"));

/// Scores and feedback derived from one critique reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CritiqueResult {
    /// Up to [`SCORE_COUNT`] scores, in dimension order.
    pub scores: Vec<u8>,
    /// Text handed to the revision agent.
    pub feedback: String,
}

impl CritiqueResult {
    /// Parse a critique reply.
    ///
    /// The whole reply is kept as feedback; the revision agent sees the
    /// scores alongside the remarks.
    pub fn parse(text: &str, mode: ScoreParsing) -> Self {
        let scores = match mode {
            ScoreParsing::Lenient => lenient_scores(text),
            ScoreParsing::Strict => strict_scores(text).unwrap_or_default(),
        };
        Self {
            scores,
            feedback: text.to_string(),
        }
    }

    /// Fewer than four usable scores. Never an error, only "not perfect".
    pub fn is_malformed(&self) -> bool {
        self.scores.len() < SCORE_COUNT
    }

    /// Exactly four scores, all at the maximum.
    ///
    /// Lenient parsing keeps only the first four numbers of a longer reply, so
    /// in that mode the length check means "at least four were found"; extra
    /// numbers after them never affect the gate.
    pub fn is_perfect(&self) -> bool {
        self.scores.len() == SCORE_COUNT && self.scores.iter().all(|&s| s == MAX_SCORE)
    }
}

/// First four standalone 0–10 integers anywhere in the text.
fn lenient_scores(text: &str) -> Vec<u8> {
    SCORE_TOKEN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .take(SCORE_COUNT)
        .collect()
}

/// Exactly four 0–10 integers from the `SCORES:` line, else `None`.
fn strict_scores(text: &str) -> Option<Vec<u8>> {
    let inner = SCORES_LINE.captures(text)?.get(1)?.as_str();
    let scores = inner
        .split(',')
        .map(|item| item.trim().parse::<u8>().ok().filter(|&s| s <= MAX_SCORE))
        .collect::<Option<Vec<u8>>>()?;
    (scores.len() == SCORE_COUNT).then_some(scores)
}
