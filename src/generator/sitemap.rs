//! Sitemap generation.
//!
//! Generates `sitemap.xml` listing every built page.
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>/</loc>
//!     <lastmod>2025-01-01</lastmod>
//!     <priority>1.0</priority>
//!   </url>
//! </urlset>
//! ```
//!
//! `lastmod` comes from the page's `date` metadata, falling back to the
//! build date. `/` gets the root priority, every other URL the default one.

use crate::{
    build::BuiltPage,
    config::{SiteConfig, SitemapConfig},
    frontmatter::Metadata,
    log, route,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use quick_xml::escape::escape;
use std::{fs, path::PathBuf};

// ============================================================================
// Constants
// ============================================================================

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// File name inside the output directory.
pub const SITEMAP_FILE: &str = "sitemap.xml";

/// Metadata key read for `lastmod`.
pub const DATE_KEY: &str = "date";

const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Public API
// ============================================================================

/// Write `sitemap.xml` for `pages` if enabled in config.
///
/// Returns the written path, or `None` when the sitemap is disabled.
pub fn build_sitemap(config: &SiteConfig, pages: &[BuiltPage]) -> Result<Option<PathBuf>> {
    if !config.sitemap.enable {
        return Ok(None);
    }

    let today = chrono::Local::now().date_naive();
    let sitemap = Sitemap::from_pages(pages, &config.sitemap, today);
    for warning in &sitemap.warnings {
        log!("warn"; "{warning}");
    }

    let path = config.paths.output.join(SITEMAP_FILE);
    fs::write(&path, sitemap.into_xml())
        .with_context(|| format!("Failed to write sitemap to {}", path.display()))?;

    log!("sitemap"; "{}", SITEMAP_FILE);
    Ok(Some(path))
}

// ============================================================================
// Sitemap Implementation
// ============================================================================

/// Sitemap data structure
pub struct Sitemap {
    urls: Vec<UrlEntry>,
    /// Pages whose `date` could not be read as a date.
    pub warnings: Vec<String>,
}

/// Single URL entry in the sitemap
#[derive(Debug, PartialEq, Eq)]
struct UrlEntry {
    loc: String,
    /// YYYY-MM-DD
    lastmod: String,
    /// One decimal place, e.g. `0.8`.
    priority: String,
}

impl Sitemap {
    /// Build sitemap entries; `today` stands in for pages without a date.
    pub fn from_pages(pages: &[BuiltPage], settings: &SitemapConfig, today: NaiveDate) -> Self {
        let base = settings
            .base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or_default();

        let mut warnings = Vec::new();
        let urls = pages
            .iter()
            .map(|page| {
                let url = route::url_path(&page.output);
                let lastmod = match lastmod(&page.meta) {
                    Ok(Some(date)) => date,
                    Ok(None) => today,
                    Err(raw) => {
                        warnings.push(format!("{url}: unrecognized date `{raw}`, using build date"));
                        today
                    }
                };
                let priority = if url == "/" {
                    settings.root_priority
                } else {
                    settings.priority
                };

                UrlEntry {
                    loc: format!("{base}{url}"),
                    lastmod: lastmod.format(DATE_FORMAT).to_string(),
                    priority: format!("{priority:.1}"),
                }
            })
            .collect();

        Self { urls, warnings }
    }

    /// Generate sitemap XML string.
    pub fn into_xml(self) -> String {
        let mut xml = String::with_capacity(128 + self.urls.len() * 128);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
        xml.push('\n');

        for entry in self.urls {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape(entry.loc.as_str())));
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", entry.lastmod));
            xml.push_str(&format!("    <priority>{}</priority>\n", entry.priority));
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Read the page date: `Ok(None)` when absent, `Err(raw)` when unreadable.
///
/// Accepts a bare `YYYY-MM-DD` or anything starting with one followed by a
/// time part (`2024-05-01T10:00:00Z`, `2024-05-01 10:00`).
fn lastmod(meta: &Metadata) -> Result<Option<NaiveDate>, String> {
    let Some(value) = meta.get(DATE_KEY) else {
        return Ok(None);
    };
    let raw = value.to_string();
    parse_date(raw.trim()).map(Some).ok_or(raw)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let (date, rest) = s.split_at_checked(10)?;
    if !(rest.is_empty() || rest.starts_with(['T', 't', ' '])) {
        return None;
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

// ============================================================================
// Tests
// ============================================================================
