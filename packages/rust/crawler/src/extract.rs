//! HTML extraction helpers: links, title/description, visible text.

use std::sync::LazyLock;

use scraper::{Html, Node, Selector};
use url::Url;

use seostudio_shared::PageMetadata;

/// Elements whose text never counts as page content.
const CHROME_TAGS: &[&str] = &["script", "style", "nav", "footer", "header"];

static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static H1_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static META_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name]").expect("valid selector"));

/// Extract all links from a document, resolved against the base URL.
///
/// Anchors, `mailto:`, `tel:` and `javascript:` hrefs are skipped and
/// fragments are stripped.
pub(crate) fn links(doc: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    for el in doc.select(&LINK_SEL) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.starts_with('#')
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("javascript:")
        {
            continue;
        }

        if let Ok(mut resolved) = base_url.join(href) {
            resolved.set_fragment(None);
            links.push(resolved);
        }
    }

    links
}

/// Title and meta description of a page.
///
/// Title falls back to the first `<h1>`, then to the URL itself.
pub(crate) fn metadata(doc: &Html, url: &str) -> PageMetadata {
    let title = first_text(doc, &TITLE_SEL)
        .or_else(|| first_text(doc, &H1_SEL))
        .unwrap_or_else(|| url.to_string());

    let description = doc
        .select(&META_SEL)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("description"))
        })
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default();

    PageMetadata {
        title,
        link: url.to_string(),
        description,
    }
}

/// Visible text of the document with chrome elements removed and whitespace
/// collapsed to single spaces.
pub(crate) fn body_text(doc: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in doc.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let in_chrome = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| CHROME_TAGS.contains(&el.name()))
        });
        if !in_chrome {
            parts.push(text);
        }
    }

    parts
        .iter()
        .flat_map(|part| part.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trimmed text of the first element matching `sel`, if non-empty.
fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}
