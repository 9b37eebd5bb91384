//! SQL migration definitions for the SEO Studio project database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: projects, page_rows",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Projects: one batch of pages for one site
CREATE TABLE IF NOT EXISTS projects (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    source_url  TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Table rows, addressed by 0-based position within a project
CREATE TABLE IF NOT EXISTS page_rows (
    project_id      TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    position        INTEGER NOT NULL,
    selected        INTEGER NOT NULL DEFAULT 0,
    title           TEXT NOT NULL DEFAULT '',
    link            TEXT NOT NULL DEFAULT '',
    keywords        TEXT NOT NULL DEFAULT '',
    description     TEXT NOT NULL DEFAULT '',
    new_description TEXT NOT NULL DEFAULT '',
    text            TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (project_id, position)
);

CREATE INDEX IF NOT EXISTS idx_page_rows_link ON page_rows(project_id, link);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
