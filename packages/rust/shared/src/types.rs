//! Core domain types for SEO Studio projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column headers of a project table, in display/export order.
pub const COLUMN_HEADERS: [&str; 7] = [
    "Выбрать",
    "Title",
    "Link",
    "Keywords",
    "Description",
    "New Description",
    "Text",
];

// ---------------------------------------------------------------------------
// ProjectId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for project identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    /// Generate a new time-sortable project identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// A named batch of pages for one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Source page the links were discovered from, if crawled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// PageRow
// ---------------------------------------------------------------------------

/// One row of a project table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRow {
    /// Row checkbox: selected rows are the targets of the next generation action.
    #[serde(rename = "Выбрать", default)]
    pub selected: bool,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Link", default)]
    pub link: String,
    #[serde(rename = "Keywords", default)]
    pub keywords: String,
    /// Description scraped from the live page.
    #[serde(rename = "Description", default)]
    pub description: String,
    /// Generated meta description.
    #[serde(rename = "New Description", default)]
    pub new_description: String,
    /// Generated long-form page text.
    #[serde(rename = "Text", default)]
    pub text: String,
}

impl PageRow {
    /// A fresh, unselected row built from scraped page metadata.
    pub fn from_metadata(meta: PageMetadata) -> Self {
        Self {
            title: meta.title,
            link: meta.link,
            description: meta.description,
            ..Default::default()
        }
    }

    /// Cell values in [`COLUMN_HEADERS`] order.
    pub fn cells(&self) -> [String; 7] {
        [
            if self.selected { "TRUE" } else { "FALSE" }.to_string(),
            self.title.clone(),
            self.link.clone(),
            self.keywords.clone(),
            self.description.clone(),
            self.new_description.clone(),
            self.text.clone(),
        ]
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: &RowUpdate) {
        if let Some(selected) = update.selected {
            self.selected = selected;
        }
        if let Some(title) = &update.title {
            self.title.clone_from(title);
        }
        if let Some(link) = &update.link {
            self.link.clone_from(link);
        }
        if let Some(description) = &update.description {
            self.description.clone_from(description);
        }
        if let Some(keywords) = &update.keywords {
            self.keywords.clone_from(keywords);
        }
        if let Some(new_description) = &update.new_description {
            self.new_description.clone_from(new_description);
        }
        if let Some(text) = &update.text {
            self.text.clone_from(text);
        }
    }
}

/// Partial update for a single row. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowUpdate {
    pub selected: Option<bool>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub new_description: Option<String>,
    pub text: Option<String>,
}

impl RowUpdate {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.selected.is_none()
            && self.title.is_none()
            && self.link.is_none()
            && self.keywords.is_none()
            && self.description.is_none()
            && self.new_description.is_none()
            && self.text.is_none()
    }
}

// ---------------------------------------------------------------------------
// PageMetadata
// ---------------------------------------------------------------------------

/// Title/description scraped from a live page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub link: String,
    pub description: String,
}

// ---------------------------------------------------------------------------
// PageBrief
// ---------------------------------------------------------------------------

/// The fixed per-page inputs driving one long-form generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBrief {
    pub title: String,
    pub link: String,
    /// Free-form, comma-ish keyword list.
    pub keywords: String,
    pub prior_description: String,
    /// Truncated scraped body text; may be empty or a placeholder.
    pub page_context: String,
}

impl PageBrief {
    /// Build a brief from a project row plus fetched page context.
    pub fn from_row(row: &PageRow, page_context: impl Into<String>) -> Self {
        Self {
            title: row.title.clone(),
            link: row.link.clone(),
            keywords: row.keywords.clone(),
            prior_description: row.description.clone(),
            page_context: page_context.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_id_roundtrip() {
        let id = ProjectId::new();
        let parsed: ProjectId = id.to_string().parse().expect("parse ProjectId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn row_serializes_with_sheet_headers() {
        let row = PageRow {
            title: "Круизы".into(),
            new_description: "desc".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&row).expect("serialize");
        assert!(json.contains(r#""Выбрать":false"#));
        assert!(json.contains(r#""New Description":"desc""#));
    }

    #[test]
    fn row_deserializes_missing_columns() {
        let row: PageRow = serde_json::from_str(r#"{"Title":"T","Link":"https://a.ru/"}"#)
            .expect("deserialize");
        assert_eq!(row.title, "T");
        assert!(row.text.is_empty());
        assert!(!row.selected);
    }

    #[test]
    fn apply_only_touches_given_fields() {
        let mut row = PageRow {
            selected: true,
            title: "T".into(),
            text: "old".into(),
            ..Default::default()
        };
        row.apply(&RowUpdate {
            selected: Some(false),
            new_description: Some("new".into()),
            ..Default::default()
        });
        assert!(!row.selected);
        assert_eq!(row.new_description, "new");
        assert_eq!(row.text, "old");
        assert_eq!(row.title, "T");
    }

    #[test]
    fn apply_edits_scraped_columns() {
        let mut row = PageRow {
            title: "Old".into(),
            link: "https://a.ru/old".into(),
            description: "old".into(),
            keywords: "k".into(),
            ..Default::default()
        };
        let update = RowUpdate {
            title: Some("New".into()),
            link: Some("https://a.ru/new".into()),
            description: Some(String::new()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        row.apply(&update);
        assert_eq!(row.title, "New");
        assert_eq!(row.link, "https://a.ru/new");
        assert!(row.description.is_empty());
        assert_eq!(row.keywords, "k");
    }

    #[test]
    fn cells_follow_header_order() {
        let row = PageRow {
            selected: true,
            link: "https://a.ru/x".into(),
            ..Default::default()
        };
        let cells = row.cells();
        assert_eq!(cells.len(), COLUMN_HEADERS.len());
        assert_eq!(cells[0], "TRUE");
        assert_eq!(cells[2], "https://a.ru/x");
    }

    #[test]
    fn brief_from_row() {
        let row = PageRow {
            title: "Круиз".into(),
            link: "https://a.ru/c".into(),
            keywords: "круиз, волга".into(),
            description: "old".into(),
            ..Default::default()
        };
        let brief = PageBrief::from_row(&row, "context");
        assert_eq!(brief.prior_description, "old");
        assert_eq!(brief.page_context, "context");
    }
}
