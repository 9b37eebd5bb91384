//! Shared types, error model, and configuration for SEO Studio.
//!
//! This crate is the foundation depended on by all other SEO Studio crates.
//! It provides:
//! - [`SeoStudioError`]: the unified error type
//! - Domain types ([`Project`], [`PageRow`], [`PageBrief`], [`PageMetadata`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, DefaultsConfig, FallbackPolicy, LlmConfig, PipelineConfig,
    ScoreParsing, config_dir, config_file_path, expand_home, init_config, load_config,
    load_config_from, resolve_api_key, validate_api_key,
};
pub use error::{ERROR_MARKER, Result, SeoStudioError, is_error_marker};
pub use types::{
    COLUMN_HEADERS, PageBrief, PageMetadata, PageRow, Project, ProjectId, RowUpdate,
};
