//! Project table export: Excel, XML and JSON.
//!
//! Every export is written atomically (temp file, then rename) and reported
//! with its SHA-256 checksum and size.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use seostudio_shared::{COLUMN_HEADERS, PageRow, Result, SeoStudioError};

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xlsx,
    Xml,
    Json,
}

impl ExportFormat {
    /// Conventional file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xml => "xml",
            Self::Json => "json",
        }
    }

    /// Guess the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "xlsx" => Some(Self::Xlsx),
            "xml" => Some(Self::Xml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Metadata for a written export file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMeta {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub rows: usize,
    pub sha256: String,
    pub size_bytes: usize,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render rows in the given format.
pub fn render(rows: &[PageRow], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Xlsx => render_xlsx(rows),
        ExportFormat::Xml => Ok(render_xml(rows).into_bytes()),
        ExportFormat::Json => render_json(rows).map(String::into_bytes),
    }
}

/// Excel column width for a header, in characters.
fn column_width(header: &str) -> f64 {
    match header {
        "Text" => 60.0,
        "Description" | "New Description" => 40.0,
        _ => 20.0,
    }
}

/// One `Sheet1` worksheet: header row, then one row per page. Every cell
/// wraps and aligns top-left.
pub fn render_xlsx(rows: &[PageRow]) -> Result<Vec<u8>> {
    build_workbook(rows).map_err(|e| SeoStudioError::Export(e.to_string()))
}

fn build_workbook(rows: &[PageRow]) -> std::result::Result<Vec<u8>, XlsxError> {
    let cell_format = Format::new()
        .set_text_wrap()
        .set_align(FormatAlign::Top)
        .set_align(FormatAlign::Left);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sheet1")?;

    for (col, header) in (0u16..).zip(COLUMN_HEADERS) {
        sheet.set_column_width(col, column_width(header))?;
        sheet.write_string_with_format(0, col, header, &cell_format)?;
    }

    for (row_idx, row) in (1u32..).zip(rows) {
        sheet.write_boolean_with_format(row_idx, 0, row.selected, &cell_format)?;
        for (col, value) in (1u16..).zip(row.cells().iter().skip(1)) {
            sheet.write_string_with_format(row_idx, col, value, &cell_format)?;
        }
    }

    workbook.save_to_buffer()
}

/// `<project><row>…</row></project>` with one element per column.
pub fn render_xml(rows: &[PageRow]) -> String {
    let tags: Vec<String> = COLUMN_HEADERS.iter().map(|h| xml_tag(h)).collect();

    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<project>\n");
    for row in rows {
        out.push_str("  <row>\n");
        for (tag, value) in tags.iter().zip(row.cells()) {
            out.push_str(&format!("    <{tag}>{}</{tag}>\n", escape_xml(&value)));
        }
        out.push_str("  </row>\n");
    }
    out.push_str("</project>\n");
    out
}

/// Pretty JSON array of row objects keyed by column header.
pub fn render_json(rows: &[PageRow]) -> Result<String> {
    serde_json::to_string_pretty(rows).map_err(|e| SeoStudioError::Export(e.to_string()))
}

/// Column header as an element name: spaces become `_`, `/` is dropped.
fn xml_tag(header: &str) -> String {
    header.replace(' ', "_").replace('/', "")
}

/// Escape markup characters and drop code points XML 1.0 cannot carry.
fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Render `rows` and write them to `path` atomically.
#[instrument(skip_all, fields(path = %path.display(), ?format, rows = rows.len()))]
pub fn export_rows(path: &Path, rows: &[PageRow], format: ExportFormat) -> Result<ExportMeta> {
    let content = render(rows, format)?;
    let (sha256, size_bytes) = write_atomic(path, &content)?;

    info!(%sha256, size_bytes, "export written");
    Ok(ExportMeta {
        path: path.to_path_buf(),
        format,
        rows: rows.len(),
        sha256,
        size_bytes,
    })
}

/// Write to a sibling temp file, then rename over `path`.
/// Returns the hex SHA-256 and byte length of the content.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(String, usize)> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| SeoStudioError::io(&dir, e))?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| SeoStudioError::Export(format!("invalid export path: {}", path.display())))?;
    let temp = dir.join(format!(".{filename}.tmp"));

    std::fs::write(&temp, content).map_err(|e| SeoStudioError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| SeoStudioError::io(path, e))?;

    let mut hasher = Sha256::new();
    hasher.update(content);
    let hash = format!("{:x}", hasher.finalize());

    debug!(file = %filename, size = content.len(), "wrote export file");
    Ok((hash, content.len()))
}
