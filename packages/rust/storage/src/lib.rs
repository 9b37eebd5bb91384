//! Turso Embedded / libSQL project store (offline mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding SEO Studio projects
//! and their page tables. Rows are addressed by their 0-based position within
//! a project, matching the order they were appended in.
//!
//! **Access rules:**
//! - Commands that edit projects: read-write via [`Storage::open`]
//! - `project show` and `export`: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use seostudio_shared::{PageRow, Project, ProjectId, Result, RowUpdate, SeoStudioError};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

fn storage_err(e: impl std::fmt::Display) -> SeoStudioError {
    SeoStudioError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SeoStudioError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    ///
    /// A missing file is an error; read-only access never creates a database.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SeoStudioError::Storage(format!(
                "database not found: {}",
                path.display()
            )));
        }
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        SeoStudioError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(SeoStudioError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Project operations
    // -----------------------------------------------------------------------

    /// Create a new, empty project.
    pub async fn create_project(&self, name: &str, source_url: Option<&str>) -> Result<Project> {
        self.check_writable()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SeoStudioError::validation("project name must not be empty"));
        }

        let now = Utc::now();
        let project = Project {
            id: ProjectId::new(),
            name: name.to_string(),
            source_url: source_url.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        self.conn
            .execute(
                "INSERT INTO projects (id, name, source_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    project.id.to_string(),
                    project.name.as_str(),
                    project.source_url.as_deref(),
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )
            .await
            .map_err(storage_err)?;

        tracing::debug!(project = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    /// List all projects, most recently created first.
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, source_url, created_at, updated_at
                 FROM projects ORDER BY created_at DESC, id DESC",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_project(&row)?);
        }
        Ok(results)
    }

    /// Get a project by ID.
    pub async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, source_url, created_at, updated_at
                 FROM projects WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_project(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Look a project up by ID string or, failing that, by exact name.
    ///
    /// When several projects share a name the newest one wins.
    pub async fn find_project(&self, id_or_name: &str) -> Result<Option<Project>> {
        if let Ok(id) = id_or_name.parse::<ProjectId>() {
            if let Some(project) = self.get_project(&id).await? {
                return Ok(Some(project));
            }
        }

        let mut rows = self
            .conn
            .query(
                "SELECT id, name, source_url, created_at, updated_at
                 FROM projects WHERE name = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![id_or_name],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_project(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Delete a project and all of its rows.
    pub async fn delete_project(&self, id: &ProjectId) -> Result<()> {
        self.check_writable()?;
        let id = id.to_string();
        let tx = self.conn.transaction().await.map_err(storage_err)?;
        tx.execute("DELETE FROM page_rows WHERE project_id = ?1", params![id.as_str()])
            .await
            .map_err(storage_err)?;
        tx.execute("DELETE FROM projects WHERE id = ?1", params![id.as_str()])
            .await
            .map_err(storage_err)?;
        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    /// Bump a project's `updated_at` timestamp.
    async fn touch_project(&self, id: &ProjectId) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE projects SET updated_at = ?1 WHERE id = ?2",
                params![now.as_str(), id.to_string()],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Row operations
    // -----------------------------------------------------------------------

    /// Load every row of a project, ordered by index.
    pub async fn load_rows(&self, project: &ProjectId) -> Result<Vec<PageRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT selected, title, link, keywords, description, new_description, text
                 FROM page_rows WHERE project_id = ?1 ORDER BY position",
                params![project.to_string()],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_page_row(&row)?);
        }
        Ok(results)
    }

    /// Number of rows in a project.
    pub async fn row_count(&self, project: &ProjectId) -> Result<usize> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM page_rows WHERE project_id = ?1",
                params![project.to_string()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(storage_err)? as usize),
            Ok(None) => Ok(0),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Append rows after the existing ones. Returns the number appended.
    pub async fn append_rows(&self, project: &ProjectId, rows: &[PageRow]) -> Result<usize> {
        self.check_writable()?;
        if rows.is_empty() {
            return Ok(0);
        }
        let start = self.row_count(project).await?;
        self.insert_rows(project, start, rows).await?;
        self.touch_project(project).await?;
        tracing::debug!(project = %project, appended = rows.len(), "rows appended");
        Ok(rows.len())
    }

    /// Replace the whole table of a project in one transaction.
    pub async fn replace_rows(&self, project: &ProjectId, rows: &[PageRow]) -> Result<()> {
        self.check_writable()?;
        let id = project.to_string();
        let tx = self.conn.transaction().await.map_err(storage_err)?;
        tx.execute(
            "DELETE FROM page_rows WHERE project_id = ?1",
            params![id.as_str()],
        )
        .await
        .map_err(storage_err)?;
        write_rows(&tx, &id, 0, rows).await?;
        tx.commit().await.map_err(storage_err)?;
        self.touch_project(project).await
    }

    /// Delete the rows at `indices` and renumber the rest, keeping their order.
    /// Returns the number of rows removed. Any index past the end of the table
    /// is a validation error and nothing is deleted.
    pub async fn delete_rows(&self, project: &ProjectId, indices: &[usize]) -> Result<usize> {
        self.check_writable()?;
        let rows = self.load_rows(project).await?;
        if let Some(bad) = indices.iter().find(|&&i| i >= rows.len()) {
            return Err(SeoStudioError::validation(format!(
                "row {bad} does not exist in project {project}"
            )));
        }

        let kept: Vec<PageRow> = rows
            .iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, row)| row.clone())
            .collect();
        let removed = rows.len() - kept.len();
        if removed > 0 {
            self.replace_rows(project, &kept).await?;
        }
        tracing::debug!(project = %project, removed, "rows deleted");
        Ok(removed)
    }

    /// Remove every row of a project, keeping the project itself.
    pub async fn clear_rows(&self, project: &ProjectId) -> Result<()> {
        self.replace_rows(project, &[]).await
    }

    /// Apply a partial update to the row at `index`.
    ///
    /// Only the fields set in `update` change. An index past the end of the
    /// table is a validation error.
    pub async fn update_row(
        &self,
        project: &ProjectId,
        index: usize,
        update: &RowUpdate,
    ) -> Result<()> {
        self.check_writable()?;
        if update.is_empty() {
            return Ok(());
        }

        let affected = self
            .conn
            .execute(
                "UPDATE page_rows SET
                   selected = COALESCE(?3, selected),
                   title = COALESCE(?4, title),
                   link = COALESCE(?5, link),
                   keywords = COALESCE(?6, keywords),
                   description = COALESCE(?7, description),
                   new_description = COALESCE(?8, new_description),
                   text = COALESCE(?9, text)
                 WHERE project_id = ?1 AND position = ?2",
                params![
                    project.to_string(),
                    index as i64,
                    update.selected.map(i64::from),
                    update.title.as_deref(),
                    update.link.as_deref(),
                    update.keywords.as_deref(),
                    update.description.as_deref(),
                    update.new_description.as_deref(),
                    update.text.as_deref(),
                ],
            )
            .await
            .map_err(storage_err)?;

        if affected == 0 {
            return Err(SeoStudioError::validation(format!(
                "row {index} does not exist in project {project}"
            )));
        }
        self.touch_project(project).await
    }

    async fn insert_rows(&self, project: &ProjectId, start: usize, rows: &[PageRow]) -> Result<()> {
        let tx = self.conn.transaction().await.map_err(storage_err)?;
        write_rows(&tx, &project.to_string(), start, rows).await?;
        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }
}

/// Insert `rows` at positions `start..` on an open transaction.
async fn write_rows(conn: &Connection, project: &str, start: usize, rows: &[PageRow]) -> Result<()> {
    for (offset, row) in rows.iter().enumerate() {
        conn.execute(
            "INSERT INTO page_rows
               (project_id, position, selected, title, link, keywords, description, new_description, text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                project,
                (start + offset) as i64,
                i64::from(row.selected),
                row.title.as_str(),
                row.link.as_str(),
                row.keywords.as_str(),
                row.description.as_str(),
                row.new_description.as_str(),
                row.text.as_str(),
            ],
        )
        .await
        .map_err(storage_err)?;
    }
    Ok(())
}

/// Convert a database row to a [`Project`].
fn row_to_project(row: &libsql::Row) -> Result<Project> {
    let id: String = row.get(0).map_err(storage_err)?;
    Ok(Project {
        id: id
            .parse()
            .map_err(|e| SeoStudioError::Storage(format!("invalid project id: {e}")))?,
        name: row.get::<String>(1).map_err(storage_err)?,
        source_url: row.get::<String>(2).ok(),
        created_at: parse_timestamp(&row.get::<String>(3).map_err(storage_err)?)?,
        updated_at: parse_timestamp(&row.get::<String>(4).map_err(storage_err)?)?,
    })
}

/// Convert a database row to a [`PageRow`].
fn row_to_page_row(row: &libsql::Row) -> Result<PageRow> {
    Ok(PageRow {
        selected: row.get::<i64>(0).map_err(storage_err)? != 0,
        title: row.get::<String>(1).map_err(storage_err)?,
        link: row.get::<String>(2).map_err(storage_err)?,
        keywords: row.get::<String>(3).map_err(storage_err)?,
        description: row.get::<String>(4).map_err(storage_err)?,
        new_description: row.get::<String>(5).map_err(storage_err)?,
        text: row.get::<String>(6).map_err(storage_err)?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SeoStudioError::Storage(format!("invalid date: {e}")))
}
