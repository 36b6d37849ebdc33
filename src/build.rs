//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── reset_output()      wipe and recreate _output/
//!     │
//!     ├── collect_pages()     every content file, sorted
//!     │       │
//!     │       └── PageBuilder::build → write_page()
//!     │           (a failing page is logged and skipped)
//!     │
//!     ├── copy_tree()         assets/ → _output/assets/
//!     ├── copy_tree()         extra/  → _output/
//!     │
//!     └── build_sitemap()     _output/sitemap.xml
//! ```
//!
//! Only resetting the output directory and writing the sitemap abort a build;
//! a page, asset or extra file that fails is reported and the rest continue.
//! Symlinks in the source trees are followed.

use crate::{
    config::{SiteConfig, defaults::dirs},
    frontmatter::Metadata,
    generator::build_sitemap,
    log,
    page::PageBuilder,
};
use anyhow::{Context, Result};
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use walkdir::WalkDir;

/// Files to ignore during directory traversal
pub const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// What the sitemap needs to know about a written page.
#[derive(Debug, Clone)]
pub struct BuiltPage {
    /// Relative to the output root.
    pub output: PathBuf,
    pub meta: Metadata,
}

/// Summary of one build.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub pages: Vec<BuiltPage>,
    /// Content files that were skipped because of an error.
    pub failed: Vec<PathBuf>,
    pub warnings: usize,
    pub assets: usize,
    pub extra: usize,
    /// Asset and extra files that could not be copied.
    pub copy_failed: Vec<PathBuf>,
    pub sitemap: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Build the entire site into the output directory.
///
/// The output directory is removed first, so the result reflects exactly
/// the current sources.
pub fn build_site(config: &SiteConfig) -> Result<BuildReport> {
    let started = Instant::now();
    let paths = &config.paths;
    let builder = PageBuilder::new(config);

    reset_output(&paths.output)?;

    let sources = collect_pages(&paths.content, &config.build.extension);
    log!(
        "build"; "{} pages, front-matter: {}",
        sources.len(),
        builder.parser_name()
    );

    let mut report = BuildReport::default();

    for source in &sources {
        let page = match builder.build(source) {
            Ok(page) => page,
            Err(e) => {
                log!("error"; "{:#}", anyhow::Error::from(e));
                report.failed.push(source.clone());
                continue;
            }
        };

        let rel = display_rel(source, &paths.content);
        for warning in &page.warnings {
            log!("warn"; "{rel}: {warning}");
        }
        report.warnings += page.warnings.len();

        if let Err(e) = write_page(&paths.output, &page.output, &page.html) {
            log!("error"; "{rel}: {e:#}");
            report.failed.push(source.clone());
            continue;
        }
        log!("content"; "{rel}");

        report.pages.push(BuiltPage {
            output: page.output,
            meta: page.meta,
        });
    }

    let assets = copy_tree(&paths.assets, &paths.output.join(dirs::ASSETS));
    let extra = copy_tree(&paths.extra, &paths.output);
    report.assets = assets.copied;
    report.extra = extra.copied;
    report.copy_failed = [assets.failed, extra.failed].concat();
    if report.assets + report.extra > 0 {
        log!("assets"; "copied {} assets, {} extra files", report.assets, report.extra);
    }

    report.sitemap = build_sitemap(config, &report.pages)?;
    report.elapsed = started.elapsed();

    log_build_result(&report);
    Ok(report)
}

/// Remove the output directory if present and create it empty.
fn reset_output(output: &Path) -> Result<()> {
    if output.exists() {
        fs::remove_dir_all(output).with_context(|| {
            format!("Failed to clear output directory: {}", output.display())
        })?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))
}

/// Content files with the given extension, in a stable order.
///
/// Entries the walk can't read are logged and skipped.
pub fn collect_pages(content: &Path, extension: &str) -> Vec<PathBuf> {
    WalkDir::new(content)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| {
            e.map_err(|err| log!("warn"; "skipping unreadable content entry: {err}"))
                .ok()
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension() == Some(OsStr::new(extension)))
        .map(|e| e.into_path())
        .collect()
}

fn write_page(output_root: &Path, rel: &Path, html: &str) -> Result<()> {
    let dest = output_root.join(rel);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(&dest, html).with_context(|| format!("Failed to write {}", dest.display()))
}

/// Outcome of [`copy_tree`].
#[derive(Debug, Default)]
pub struct Copied {
    pub copied: usize,
    /// Source files (or unreadable entries) that were not copied.
    pub failed: Vec<PathBuf>,
}

/// Recursively copy every file under `src` into `dst`, overwriting what is
/// already there. A missing `src` copies nothing.
///
/// A file that can't be copied is logged and recorded in [`Copied::failed`];
/// the rest of the tree is still copied.
pub fn copy_tree(src: &Path, dst: &Path) -> Copied {
    let mut result = Copied::default();
    if !src.is_dir() {
        return result;
    }

    for entry in WalkDir::new(src).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log!("error"; "failed to walk {}: {e}", src.display());
                result.failed.push(e.path().unwrap_or(src).to_path_buf());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_str().unwrap_or_default();
        if IGNORED_FILES.contains(&name) {
            continue;
        }

        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        match copy_file(entry.path(), &dst.join(rel)) {
            Ok(()) => result.copied += 1,
            Err(e) => {
                log!("error"; "{e:#}");
                result.failed.push(entry.into_path());
            }
        }
    }

    result
}

fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::copy(src, dest)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))?;
    Ok(())
}

fn display_rel(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}

/// Log build result
fn log_build_result(report: &BuildReport) {
    if !report.failed.is_empty() {
        log!("warn"; "{} pages failed to build", report.failed.len());
    }
    if !report.copy_failed.is_empty() {
        log!("warn"; "{} files failed to copy", report.copy_failed.len());
    }
    if report.pages.is_empty() {
        log!("warn"; "output has no pages, check the content directory");
    }
    log!(
        "build"; "done in {:.2}s ({} pages, {} warnings)",
        report.elapsed.as_secs_f64(),
        report.pages.len(),
        report.warnings
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SitePaths, frontmatter::MetaValue};
    use tempfile::TempDir;

    fn site(files: &[(&str, &str)]) -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        for (rel, text) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        let config = SiteConfig {
            paths: SitePaths::new(dir.path()),
            ..SiteConfig::default()
        };
        (dir, config)
    }

    fn read(dir: &TempDir, rel: &str) -> String {
        fs::read_to_string(dir.path().join(rel)).unwrap()
    }

    #[test]
    fn test_build_site_end_to_end() {
        let (dir, config) = site(&[
            ("layouts/base.html", "<html><template variable=\"content\"></html>"),
            ("content/index.html", "---\nlayout: base.html\n---\nhome"),
            ("content/blog/index.html", "blog"),
            ("content/blog/post1.html", "---\ndate: 2024-01-02\n---\npost"),
            ("assets/css/site.css", "body{}"),
            ("extra/robots.txt", "User-agent: *"),
        ]);

        let report = build_site(&config).unwrap();

        assert_eq!(read(&dir, "_output/index.html"), "<html>home</html>");
        assert_eq!(read(&dir, "_output/blog/index.html"), "blog");
        assert_eq!(read(&dir, "_output/blog/post1/index.html"), "post");
        assert_eq!(read(&dir, "_output/assets/css/site.css"), "body{}");
        assert_eq!(read(&dir, "_output/robots.txt"), "User-agent: *");
        assert_eq!(report.pages.len(), 3);
        assert_eq!((report.assets, report.extra), (1, 1));
        assert!(report.failed.is_empty());

        let sitemap = read(&dir, "_output/sitemap.xml");
        assert!(sitemap.contains("<loc>/</loc>"));
        assert!(sitemap.contains("<loc>/blog/</loc>"));
        assert!(sitemap.contains("<loc>/blog/post1/</loc>"));
        assert!(sitemap.contains("<lastmod>2024-01-02</lastmod>"));
    }

    #[test]
    fn test_build_site_wipes_stale_output() {
        let (dir, config) = site(&[("content/index.html", "home"), ("_output/old/stale.html", "x")]);

        build_site(&config).unwrap();

        assert!(!dir.path().join("_output/old").exists());
        assert!(dir.path().join("_output/index.html").exists());
    }

    #[test]
    fn test_build_site_isolates_failing_page() {
        let (dir, config) = site(&[
            ("layouts/loop.html", "<template include=\"loop.html\">"),
            ("content/bad.html", "<template include=\"loop.html\">"),
            ("content/good.html", "fine"),
        ]);

        let report = build_site(&config).unwrap();

        assert_eq!(report.failed, vec![dir.path().join("content/bad.html")]);
        assert_eq!(report.pages.len(), 1);
        assert_eq!(read(&dir, "_output/good/index.html"), "fine");
        assert!(!dir.path().join("_output/bad").exists());

        let sitemap = read(&dir, "_output/sitemap.xml");
        assert!(sitemap.contains("<loc>/good/</loc>"));
        assert!(!sitemap.contains("/bad/"));
    }

    #[test]
    fn test_build_site_copy_conflict_keeps_building() {
        let (dir, config) = site(&[
            ("content/about.html", "about"),
            ("extra/about", "collides with the about/ page directory"),
            ("extra/robots.txt", "User-agent: *"),
        ]);

        let report = build_site(&config).unwrap();

        assert_eq!(report.copy_failed, vec![dir.path().join("extra/about")]);
        assert_eq!(report.extra, 1);
        assert_eq!(read(&dir, "_output/about/index.html"), "about");
        assert_eq!(read(&dir, "_output/robots.txt"), "User-agent: *");
        assert!(read(&dir, "_output/sitemap.xml").contains("<loc>/about/</loc>"));
    }

    #[test]
    fn test_build_site_extra_overrides_pages() {
        let (dir, config) = site(&[
            ("content/index.html", "generated"),
            ("extra/index.html", "from extra"),
        ]);

        build_site(&config).unwrap();
        assert_eq!(read(&dir, "_output/index.html"), "from extra");
    }

    #[test]
    fn test_build_site_counts_warnings_and_keeps_meta() {
        let (_dir, config) = site(&[(
            "content/index.html",
            "---\ntitle: Home\nlayout: missing.html\n---\n<template include=\"gone.html\">",
        )]);

        let report = build_site(&config).unwrap();

        assert_eq!(report.warnings, 2);
        assert_eq!(report.pages[0].meta.get("title"), Some(&MetaValue::from("Home")));
    }

    #[test]
    fn test_build_site_sitemap_disabled() {
        let (dir, mut config) = site(&[("content/index.html", "home")]);
        config.sitemap.enable = false;

        let report = build_site(&config).unwrap();

        assert!(report.sitemap.is_none());
        assert!(!dir.path().join("_output/sitemap.xml").exists());
    }

    #[test]
    fn test_collect_pages_filters_and_sorts() {
        let (dir, _) = site(&[
            ("content/b.html", ""),
            ("content/a.html", ""),
            ("content/notes.txt", ""),
            ("content/sub/c.html", ""),
        ]);
        let content = dir.path().join("content");

        let pages = collect_pages(&content, "html");
        assert_eq!(
            pages,
            vec![content.join("a.html"), content.join("b.html"), content.join("sub/c.html")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_pages_follows_symlinks() {
        let (dir, _) = site(&[("shared/post.html", "shared"), ("content/index.html", "")]);
        let content = dir.path().join("content");
        std::os::unix::fs::symlink(dir.path().join("shared/post.html"), content.join("post.html"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("shared"), content.join("linked")).unwrap();

        let pages = collect_pages(&content, "html");
        assert_eq!(
            pages,
            vec![
                content.join("index.html"),
                content.join("linked/post.html"),
                content.join("post.html"),
            ]
        );
    }

    #[test]
    fn test_copy_tree_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = copy_tree(&dir.path().join("nope"), &dir.path().join("out"));
        assert_eq!(result.copied, 0);
        assert!(result.failed.is_empty());
        assert!(!dir.path().join("out").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_follows_symlinks() {
        let (dir, _) = site(&[("theme/site.css", "body{}"), ("assets/app.js", "")]);
        std::os::unix::fs::symlink(
            dir.path().join("theme/site.css"),
            dir.path().join("assets/site.css"),
        )
        .unwrap();

        let result = copy_tree(&dir.path().join("assets"), &dir.path().join("out"));

        assert_eq!(result.copied, 2);
        assert_eq!(read(&dir, "out/site.css"), "body{}");
        assert!(!dir.path().join("out/site.css").is_symlink());
    }

    #[test]
    fn test_copy_tree_skips_ignored_files() {
        let (dir, _) = site(&[("assets/.DS_Store", ""), ("assets/img/logo.svg", "<svg/>")]);

        let result = copy_tree(&dir.path().join("assets"), &dir.path().join("out"));

        assert_eq!(result.copied, 1);
        assert!(dir.path().join("out/img/logo.svg").exists());
        assert!(!dir.path().join("out/.DS_Store").exists());
    }
}
