//! Single-pass page fetcher: link discovery, metadata, and body text.
//!
//! Every request is one-shot. The fetcher never recurses; the caller decides
//! which discovered links to visit and in what order.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::Duration;

use reqwest::{Client, StatusCode, header};
use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

use seostudio_shared::{CrawlConfig, PageMetadata, Result, SeoStudioError};

use crate::extract;

/// `Accept` header sent with page requests.
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
    image/avif,image/webp,image/apng,*/*;q=0.8";

// ---------------------------------------------------------------------------
// PageFetcher
// ---------------------------------------------------------------------------

/// HTTP client wrapper for scraping a single site.
pub struct PageFetcher {
    config: CrawlConfig,
    client: Client,
    /// Allow localhost/private IPs (for mock servers and local dev sites).
    allow_localhost: bool,
}

impl PageFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SeoStudioError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            allow_localhost: false,
        })
    }

    /// Allow fetching localhost/private IPs.
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    /// Fetch `source_url` and return every same-site page link it contains.
    ///
    /// Links are absolute, fragment-free, deduplicated and sorted.
    #[instrument(skip(self), fields(source_url = %source_url))]
    pub async fn discover_links(&self, source_url: &Url) -> Result<Vec<String>> {
        self.check_target(source_url)?;

        let response = self
            .client
            .get(source_url.as_str())
            .header(header::ACCEPT, ACCEPT_HTML)
            .header(header::ACCEPT_LANGUAGE, self.config.accept_language.as_str())
            .send()
            .await
            .map_err(|e| SeoStudioError::Network(format!("{source_url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SeoStudioError::Network(format!(
                "{source_url}: HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SeoStudioError::Network(format!("{source_url}: body read failed: {e}")))?;

        let doc = Html::parse_document(&body);
        let base_domain = netloc(source_url);

        let links: BTreeSet<String> = extract::links(&doc, source_url)
            .into_iter()
            .filter(|link| self.is_page_url(link, &base_domain))
            .map(|link| link.to_string())
            .collect();

        info!(count = links.len(), "discovered links");
        Ok(links.into_iter().collect())
    }

    /// Fetch title and meta description for `url`.
    ///
    /// Returns `None` on any request failure or non-200 response.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_metadata(&self, url: &str) -> Option<PageMetadata> {
        let body = self.fetch_ok_body(url, true).await?;
        let doc = Html::parse_document(&body);
        Some(extract::metadata(&doc, url))
    }

    /// Fetch the visible body text of `url`, truncated to `max_chars` characters.
    ///
    /// Returns an empty string on any failure.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_content(&self, url: &str, max_chars: usize) -> String {
        let Some(body) = self.fetch_ok_body(url, false).await else {
            return String::new();
        };
        let doc = Html::parse_document(&body);
        let text = extract::body_text(&doc);
        truncate_chars(&text, max_chars)
    }

    /// GET `url` and return the body only for a 200 response.
    async fn fetch_ok_body(&self, url: &str, accept_html: bool) -> Option<String> {
        let parsed = Url::parse(url)
            .inspect_err(|e| debug!(url, error = %e, "unparseable url"))
            .ok()?;
        if let Err(e) = self.check_target(&parsed) {
            warn!(url, error = %e, "refusing to fetch");
            return None;
        }

        let mut request = self.client.get(parsed.as_str());
        if accept_html {
            request = request.header(header::ACCEPT, ACCEPT_HTML);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url, error = %e, "request failed");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            debug!(url, status = %response.status(), "non-200 response");
            return None;
        }

        response
            .text()
            .await
            .inspect_err(|e| debug!(url, error = %e, "body read failed"))
            .ok()
    }

    /// Refuse non-HTTP schemes and private targets unless allowed.
    fn check_target(&self, url: &Url) -> Result<()> {
        if !self.allow_localhost && is_ssrf_target(url) {
            return Err(SeoStudioError::validation(format!(
                "{url}: private or non-HTTP target blocked"
            )));
        }
        Ok(())
    }

    /// Whether a discovered link is an HTML page on the source site.
    fn is_page_url(&self, url: &Url, base_domain: &str) -> bool {
        if !url.scheme().starts_with("http") {
            return false;
        }

        let path = url.path().to_lowercase();
        if self
            .config
            .skip_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()))
        {
            return false;
        }

        base_domain.is_empty() || netloc(url).contains(base_domain)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `host[:port]` of a URL.
fn netloc(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Truncate to at most `max_chars` Unicode scalar values.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    if let Some(host) = url.host_str() {
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return is_private_ip(&ip);
        }
        if host == "localhost" || host.ends_with(".local") || host.ends_with(".internal") {
            return true;
        }
    }

    false
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
