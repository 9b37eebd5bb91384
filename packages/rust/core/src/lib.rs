//! Text-generation core for SEO Studio.
//!
//! This crate provides:
//! - [`model`]: the `TextModel` seam and ordered-preference resolver
//! - [`gemini`]: the Gemini REST backend
//! - Agents: [`draft`], [`refine()`], [`describe()`], [`write_page_text`]
//! - [`pipeline`]: crawl/describe/write batch actions over a project

pub mod critique;
pub mod describe;
pub mod drafting;
pub mod gemini;
pub mod model;
pub mod multi_agent;
pub mod pipeline;
pub mod prompts;
pub mod refine;

pub use critique::CritiqueResult;
pub use describe::{MAX_DESCRIPTION_CHARS, clamp_description, describe};
pub use drafting::draft;
pub use gemini::{GeminiBackend, resolve_gemini};
pub use model::{ModelBackend, ModelHandle, TextModel, resolve};
pub use multi_agent::write_page_text;
pub use pipeline::{
    BatchSummary, CONTEXT_PLACEHOLDER, ContextSource, CrawlSummary, ProgressReporter, RowFailure,
    SilentProgress, WriteOptions, crawl_into_project, describe_rows, write_rows,
};
pub use refine::{MAX_ITERATIONS, RefineOptions, Refined, refine};
