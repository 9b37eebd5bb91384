//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use url::Url;

use seostudio_artifacts::ExportFormat;
use seostudio_core::pipeline::{self, BatchSummary, ProgressReporter, WriteOptions};
use seostudio_core::{RefineOptions, resolve_gemini};
use seostudio_crawler::PageFetcher;
use seostudio_shared::{
    AppConfig, PageRow, Project, RowUpdate, expand_home, init_config, load_config,
    resolve_api_key, validate_api_key,
};
use seostudio_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SEO Studio: crawl a site and generate page copy with Gemini.
#[derive(Parser)]
#[command(
    name = "seostudio",
    version,
    about = "Crawl a site, generate meta descriptions and page text, export the table.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project database path (overrides `[defaults] database`).
    #[arg(long, global = true, env = "SEOSTUDIO_DB")]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Export file format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ExportFormatArg {
    Xlsx,
    Xml,
    Json,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Xlsx => Self::Xlsx,
            ExportFormatArg::Xml => Self::Xml,
            ExportFormatArg::Json => Self::Json,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Project management.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Discover links on a page and add the new ones to a project.
    Crawl {
        /// Project name or ID.
        #[arg(short, long)]
        project: String,

        /// Page to discover links on (defaults to the project's source URL).
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Generate meta descriptions for selected rows (or rows without one).
    Describe {
        /// Project name or ID.
        #[arg(short, long)]
        project: String,
    },

    /// Generate page text for selected rows (or rows without any).
    Write {
        /// Project name or ID.
        #[arg(short, long)]
        project: String,
    },

    /// Mark rows as selected.
    Select {
        /// Project name or ID.
        #[arg(short, long)]
        project: String,

        /// Row indices (0-based).
        #[arg(required_unless_present = "all")]
        rows: Vec<usize>,

        /// Select every row.
        #[arg(long)]
        all: bool,
    },

    /// Clear the selection mark on rows.
    Unselect {
        /// Project name or ID.
        #[arg(short, long)]
        project: String,

        /// Row indices (0-based).
        #[arg(required_unless_present = "all")]
        rows: Vec<usize>,

        /// Unselect every row.
        #[arg(long)]
        all: bool,
    },

    /// Edit, add or delete table rows.
    Row {
        #[command(subcommand)]
        action: RowAction,
    },

    /// Set the target keywords of a row.
    Keywords {
        /// Project name or ID.
        #[arg(short, long)]
        project: String,

        /// Row index (0-based).
        row: usize,

        /// Keyword list, e.g. "купить диван, диван недорого".
        keywords: String,
    },

    /// Export a project table to a file.
    Export {
        /// Project name or ID.
        #[arg(short, long)]
        project: String,

        /// Output file path.
        #[arg(short, long)]
        out: PathBuf,

        /// Output format (defaults to the file extension, then xml).
        #[arg(short, long)]
        format: Option<ExportFormatArg>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Project subcommands.
#[derive(Subcommand)]
pub(crate) enum ProjectAction {
    /// Create an empty project.
    Create {
        /// Project name.
        name: String,

        /// Source page to crawl later.
        #[arg(short, long)]
        url: Option<String>,
    },
    /// List all projects.
    List,
    /// Print a project's rows.
    Show {
        /// Project name or ID.
        project: String,
    },
    /// Delete a project and its rows.
    Delete {
        /// Project name or ID.
        project: String,
    },
    /// Remove every row from a project.
    Clear {
        /// Project name or ID.
        project: String,
    },
}

/// Editable table columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum RowField {
    Title,
    Link,
    Keywords,
    Description,
    NewDescription,
    Text,
}

impl RowField {
    /// Partial update setting this column to `value`.
    fn update(self, value: String) -> RowUpdate {
        let mut update = RowUpdate::default();
        let slot = match self {
            Self::Title => &mut update.title,
            Self::Link => &mut update.link,
            Self::Keywords => &mut update.keywords,
            Self::Description => &mut update.description,
            Self::NewDescription => &mut update.new_description,
            Self::Text => &mut update.text,
        };
        *slot = Some(value);
        update
    }
}

/// Row subcommands.
#[derive(Subcommand)]
pub(crate) enum RowAction {
    /// Set one cell of a row.
    Set {
        /// Project name or ID.
        #[arg(short, long)]
        project: String,

        /// Row index (0-based).
        row: usize,

        /// Column to change.
        field: RowField,

        /// New cell value (an empty string clears the cell).
        value: String,
    },
    /// Append a page by hand.
    Add {
        /// Project name or ID.
        #[arg(short, long)]
        project: String,

        /// Page URL.
        link: String,

        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        keywords: String,

        /// Current meta description.
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete rows; the remaining rows are renumbered.
    Delete {
        /// Project name or ID.
        #[arg(short, long)]
        project: String,

        /// Row indices (0-based).
        #[arg(required = true)]
        rows: Vec<usize>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "seostudio=info",
        1 => "seostudio=debug",
        _ => "seostudio=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Project { action } => match action {
            ProjectAction::Create { name, url } => {
                cmd_project_create(db, &name, url.as_deref()).await
            }
            ProjectAction::List => cmd_project_list(db).await,
            ProjectAction::Show { project } => cmd_project_show(db, &project).await,
            ProjectAction::Delete { project } => cmd_project_delete(db, &project).await,
            ProjectAction::Clear { project } => cmd_project_clear(db, &project).await,
        },
        Command::Crawl { project, url } => cmd_crawl(db, &project, url.as_deref()).await,
        Command::Describe { project } => cmd_describe(db, &project).await,
        Command::Write { project } => cmd_write(db, &project).await,
        Command::Select { project, rows, all } => {
            cmd_set_selected(db, &project, &rows, all, true).await
        }
        Command::Unselect { project, rows, all } => {
            cmd_set_selected(db, &project, &rows, all, false).await
        }
        Command::Row { action } => match action {
            RowAction::Set {
                project,
                row,
                field,
                value,
            } => cmd_row_set(db, &project, row, field, value).await,
            RowAction::Add {
                project,
                link,
                title,
                keywords,
                description,
            } => {
                let row = new_row(&link, title, keywords, description)?;
                cmd_row_add(db, &project, row).await
            }
            RowAction::Delete { project, rows } => cmd_row_delete(db, &project, &rows).await,
        },
        Command::Keywords {
            project,
            row,
            keywords,
        } => cmd_keywords(db, &project, row, keywords).await,
        Command::Export {
            project,
            out,
            format,
        } => cmd_export(db, &project, &out, format).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load config and open the project database.
async fn open_store(db: Option<String>) -> Result<(AppConfig, Storage)> {
    let config = load_config()?;
    let path = expand_home(db.as_deref().unwrap_or(config.defaults.database.as_str()));
    let storage = Storage::open(&path).await?;
    Ok((config, storage))
}

/// Open the project database read-only. It must already exist.
async fn open_store_readonly(db: Option<String>) -> Result<Storage> {
    let config = load_config()?;
    let path = expand_home(db.as_deref().unwrap_or(config.defaults.database.as_str()));
    Ok(Storage::open_readonly(&path).await?)
}

async fn find_project(storage: &Storage, id_or_name: &str) -> Result<Project> {
    storage
        .find_project(id_or_name)
        .await?
        .ok_or_else(|| eyre!("project '{id_or_name}' not found"))
}

/// A flag flipped by the first Ctrl-C; batch actions stop before the next row.
/// A second Ctrl-C exits immediately.
fn cancel_on_ctrl_c() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handle = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupt received, stopping after the current row (Ctrl-C again to abort)");
        handle.store(true, Ordering::Relaxed);

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
    flag
}

fn print_batch_summary(action: &str, summary: &BatchSummary) {
    println!();
    println!("  {action} finished");
    println!("  Targeted:  {}", summary.targeted);
    println!("  Written:   {}", summary.succeeded);
    println!("  Failed:    {}", summary.failures.len());
    for failure in &summary.failures {
        println!("    [{}] {}: {}", failure.index, failure.link, failure.error);
    }
    if summary.cancelled {
        println!("  Stopped early (interrupted)");
    }
    println!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());
    println!();
}

/// First `max` characters of a cell, on one line.
fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, label: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {label}"));
    }

    fn item_failed(&self, label: &str, error: &str) {
        self.spinner.println(format!("  ✗ {label}: {error}"));
    }
}

// ---------------------------------------------------------------------------
// Project commands
// ---------------------------------------------------------------------------

async fn cmd_project_create(db: Option<String>, name: &str, url: Option<&str>) -> Result<()> {
    if let Some(url) = url {
        Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;
    }
    let (_, storage) = open_store(db).await?;
    let project = storage.create_project(name, url).await?;
    info!(id = %project.id, name = %project.name, "project created");
    println!("Created project '{}' ({})", project.name, project.id);
    Ok(())
}

async fn cmd_project_list(db: Option<String>) -> Result<()> {
    let (_, storage) = open_store(db).await?;
    let projects = storage.list_projects().await?;
    if projects.is_empty() {
        println!("No projects yet. Create one with `seostudio project create <name>`.");
        return Ok(());
    }

    for project in projects {
        let rows = storage.row_count(&project.id).await?;
        println!(
            "{}  {:<24} {:>5} rows  {}",
            project.id,
            project.name,
            rows,
            project.source_url.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn cmd_project_show(db: Option<String>, id_or_name: &str) -> Result<()> {
    let storage = open_store_readonly(db).await?;
    let project = find_project(&storage, id_or_name).await?;
    let rows = storage.load_rows(&project.id).await?;

    println!("{} ({}), {} rows", project.name, project.id, rows.len());
    for (i, row) in rows.iter().enumerate() {
        println!(
            "{i:>4} [{}] {}",
            if row.selected { "x" } else { " " },
            preview(&row.title, 60)
        );
        println!("       {}", row.link);
        if !row.keywords.is_empty() {
            println!("       keywords: {}", preview(&row.keywords, 80));
        }
        if !row.new_description.is_empty() {
            println!("       description: {}", preview(&row.new_description, 80));
        }
        if !row.text.is_empty() {
            println!("       text: {} chars", row.text.chars().count());
        }
    }
    Ok(())
}

async fn cmd_project_delete(db: Option<String>, id_or_name: &str) -> Result<()> {
    let (_, storage) = open_store(db).await?;
    let project = find_project(&storage, id_or_name).await?;
    storage.delete_project(&project.id).await?;
    println!("Deleted project '{}'", project.name);
    Ok(())
}

async fn cmd_project_clear(db: Option<String>, id_or_name: &str) -> Result<()> {
    let (_, storage) = open_store(db).await?;
    let project = find_project(&storage, id_or_name).await?;
    storage.clear_rows(&project.id).await?;
    println!("Cleared all rows of '{}'", project.name);
    Ok(())
}

// ---------------------------------------------------------------------------
// Batch actions
// ---------------------------------------------------------------------------

async fn cmd_crawl(db: Option<String>, id_or_name: &str, url: Option<&str>) -> Result<()> {
    let (config, storage) = open_store(db).await?;
    let project = find_project(&storage, id_or_name).await?;

    let source = url
        .or(project.source_url.as_deref())
        .ok_or_else(|| eyre!("no URL given and project '{}' has no source URL", project.name))?;
    let source = Url::parse(source).map_err(|e| eyre!("invalid URL '{source}': {e}"))?;

    let fetcher = PageFetcher::new(config.crawl.clone())?;
    let cancel = cancel_on_ctrl_c();
    let reporter = CliProgress::new();

    info!(project = %project.name, url = %source, "crawling");
    let result = pipeline::crawl_into_project(
        &storage,
        &fetcher,
        &project.id,
        &source,
        config.defaults.batch_size,
        &cancel,
        &reporter,
    )
    .await;
    reporter.finish();
    let summary = result?;

    println!();
    println!("  Crawl finished");
    println!("  Links found:  {}", summary.discovered);
    println!("  New links:    {}", summary.new_links);
    println!("  Rows added:   {}", summary.appended);
    println!("  Unreachable:  {}", summary.unreachable);
    if summary.cancelled {
        println!("  Stopped early (interrupted)");
    }
    println!("  Time:         {:.1}s", summary.elapsed.as_secs_f64());
    println!();
    Ok(())
}

async fn cmd_describe(db: Option<String>, id_or_name: &str) -> Result<()> {
    let (config, storage) = open_store(db).await?;
    let project = find_project(&storage, id_or_name).await?;

    let model = resolve_gemini(&config.llm, resolve_api_key(&config)?)?;
    let cancel = cancel_on_ctrl_c();
    let reporter = CliProgress::new();

    let result = pipeline::describe_rows(&storage, &project.id, &model, &cancel, &reporter).await;
    reporter.finish();
    print_batch_summary("Describe", &result?);
    Ok(())
}

async fn cmd_write(db: Option<String>, id_or_name: &str) -> Result<()> {
    let (config, storage) = open_store(db).await?;
    let project = find_project(&storage, id_or_name).await?;

    let model = resolve_gemini(&config.llm, resolve_api_key(&config)?)?;
    let fetcher = PageFetcher::new(config.crawl.clone())?;
    let options = WriteOptions {
        refine: RefineOptions::from(&config.pipeline),
        context_chars: config.defaults.context_chars,
    };
    let cancel = cancel_on_ctrl_c();
    let reporter = CliProgress::new();

    let result = pipeline::write_rows(
        &storage,
        &fetcher,
        &project.id,
        &model,
        &options,
        &cancel,
        &reporter,
    )
    .await;
    reporter.finish();
    print_batch_summary("Write", &result?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Row edits
// ---------------------------------------------------------------------------

async fn cmd_set_selected(
    db: Option<String>,
    id_or_name: &str,
    rows: &[usize],
    all: bool,
    selected: bool,
) -> Result<()> {
    let (_, storage) = open_store(db).await?;
    let project = find_project(&storage, id_or_name).await?;

    let indices: Vec<usize> = if all {
        (0..storage.row_count(&project.id).await?).collect()
    } else {
        rows.to_vec()
    };

    let update = RowUpdate {
        selected: Some(selected),
        ..Default::default()
    };
    for &index in &indices {
        storage.update_row(&project.id, index, &update).await?;
    }

    println!(
        "{} {} row(s) in '{}'",
        if selected { "Selected" } else { "Unselected" },
        indices.len(),
        project.name
    );
    Ok(())
}

/// A hand-entered row. The link must be an absolute URL.
fn new_row(link: &str, title: String, keywords: String, description: String) -> Result<PageRow> {
    Url::parse(link).map_err(|e| eyre!("invalid URL '{link}': {e}"))?;
    Ok(PageRow {
        title,
        link: link.to_string(),
        keywords,
        description,
        ..Default::default()
    })
}

async fn cmd_row_set(
    db: Option<String>,
    id_or_name: &str,
    row: usize,
    field: RowField,
    value: String,
) -> Result<()> {
    if field == RowField::Link {
        Url::parse(&value).map_err(|e| eyre!("invalid URL '{value}': {e}"))?;
    }
    let (_, storage) = open_store(db).await?;
    let project = find_project(&storage, id_or_name).await?;
    storage
        .update_row(&project.id, row, &field.update(value))
        .await?;
    println!("Updated {field:?} of row {row}");
    Ok(())
}

async fn cmd_row_add(db: Option<String>, id_or_name: &str, row: PageRow) -> Result<()> {
    let (_, storage) = open_store(db).await?;
    let project = find_project(&storage, id_or_name).await?;

    let existing = storage.load_rows(&project.id).await?;
    if existing.iter().any(|r| r.link == row.link) {
        warn!(link = %row.link, "link already present in project");
    }
    storage.append_rows(&project.id, std::slice::from_ref(&row)).await?;
    println!("Added row {} to '{}': {}", existing.len(), project.name, row.link);
    Ok(())
}

async fn cmd_row_delete(db: Option<String>, id_or_name: &str, rows: &[usize]) -> Result<()> {
    let (_, storage) = open_store(db).await?;
    let project = find_project(&storage, id_or_name).await?;
    let removed = storage.delete_rows(&project.id, rows).await?;
    println!("Deleted {removed} row(s) from '{}'", project.name);
    Ok(())
}

async fn cmd_keywords(
    db: Option<String>,
    id_or_name: &str,
    row: usize,
    keywords: String,
) -> Result<()> {
    let (_, storage) = open_store(db).await?;
    let project = find_project(&storage, id_or_name).await?;
    storage
        .update_row(
            &project.id,
            row,
            &RowUpdate {
                keywords: Some(keywords),
                ..Default::default()
            },
        )
        .await?;
    println!("Updated keywords of row {row}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

async fn cmd_export(
    db: Option<String>,
    id_or_name: &str,
    out: &Path,
    format: Option<ExportFormatArg>,
) -> Result<()> {
    let storage = open_store_readonly(db).await?;
    let project = find_project(&storage, id_or_name).await?;
    let rows = storage.load_rows(&project.id).await?;

    let format = format
        .map(ExportFormat::from)
        .or_else(|| ExportFormat::from_path(out))
        .unwrap_or(ExportFormat::Xml);
    let meta = seostudio_artifacts::export_rows(out, &rows, format)?;

    println!();
    println!("  Exported '{}'", project.name);
    println!("  Path:    {}", meta.path.display());
    println!("  Rows:    {}", meta.rows);
    println!("  Size:    {} bytes", meta.size_bytes);
    println!("  SHA-256: {}", meta.sha256);
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    match validate_api_key(&config) {
        Ok(()) => println!("# API key: ${} is set", config.llm.api_key_env),
        Err(e) => println!("# API key: {e}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_select_with_indices() {
        let cli = Cli::try_parse_from(["seostudio", "select", "-p", "shop", "0", "3"]).unwrap();
        match cli.command {
            Command::Select { project, rows, all } => {
                assert_eq!(project, "shop");
                assert_eq!(rows, vec![0, 3]);
                assert!(!all);
            }
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn select_requires_rows_or_all() {
        assert!(Cli::try_parse_from(["seostudio", "select", "-p", "shop"]).is_err());
        assert!(Cli::try_parse_from(["seostudio", "select", "-p", "shop", "--all"]).is_ok());
    }

    #[test]
    fn verbose_and_global_db_flag() {
        let cli =
            Cli::try_parse_from(["seostudio", "-vv", "project", "list", "--db", "/tmp/x.db"])
                .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.db.as_deref(), Some("/tmp/x.db"));
    }

    #[test]
    fn parses_row_set() {
        let cli = Cli::try_parse_from([
            "seostudio",
            "row",
            "set",
            "-p",
            "shop",
            "2",
            "new-description",
            "Новое описание",
        ])
        .unwrap();
        match cli.command {
            Command::Row {
                action:
                    RowAction::Set {
                        project,
                        row,
                        field,
                        value,
                    },
            } => {
                assert_eq!(project, "shop");
                assert_eq!(row, 2);
                assert_eq!(field, RowField::NewDescription);
                assert_eq!(value, "Новое описание");
            }
            _ => panic!("expected row set"),
        }
    }

    #[test]
    fn parses_row_add_and_delete() {
        let cli = Cli::try_parse_from([
            "seostudio",
            "row",
            "add",
            "-p",
            "shop",
            "https://site.ru/divany",
            "--title",
            "Диваны",
        ])
        .unwrap();
        match cli.command {
            Command::Row {
                action:
                    RowAction::Add {
                        link,
                        title,
                        keywords,
                        ..
                    },
            } => {
                assert_eq!(link, "https://site.ru/divany");
                assert_eq!(title, "Диваны");
                assert!(keywords.is_empty());
            }
            _ => panic!("expected row add"),
        }

        let cli = Cli::try_parse_from(["seostudio", "row", "delete", "-p", "shop", "1", "4"]).unwrap();
        match cli.command {
            Command::Row {
                action: RowAction::Delete { rows, .. },
            } => assert_eq!(rows, vec![1, 4]),
            _ => panic!("expected row delete"),
        }
        assert!(Cli::try_parse_from(["seostudio", "row", "delete", "-p", "shop"]).is_err());
    }

    #[test]
    fn row_field_sets_exactly_one_column() {
        let update = RowField::Title.update("Диваны".into());
        assert_eq!(update.title.as_deref(), Some("Диваны"));
        assert!(update.link.is_none() && update.text.is_none());

        let update = RowField::Text.update(String::new());
        assert_eq!(update.text.as_deref(), Some(""));
        assert!(!update.is_empty());
        assert!(update.title.is_none());
    }

    #[test]
    fn new_row_requires_absolute_url() {
        let row = new_row("https://site.ru/a", "A".into(), "k".into(), String::new()).unwrap();
        assert_eq!(row.link, "https://site.ru/a");
        assert!(!row.selected);
        assert!(new_row("/relative", String::new(), String::new(), String::new()).is_err());
    }

    #[test]
    fn export_format_arg_accepts_xlsx() {
        let cli = Cli::try_parse_from([
            "seostudio", "export", "-p", "shop", "-o", "out.bin", "-f", "xlsx",
        ])
        .unwrap();
        match cli.command {
            Command::Export { format, .. } => {
                assert_eq!(format.map(ExportFormat::from), Some(ExportFormat::Xlsx));
            }
            _ => panic!("expected export"),
        }
    }

    #[test]
    fn preview_flattens_and_cuts() {
        assert_eq!(preview("a\n\nb   c", 10), "a b c");
        assert_eq!(preview("абвгдеёжз", 5), "абвг…");
    }
}
