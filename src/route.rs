//! Mapping from content files to output files and URLs.
//!
//! ```text
//! content/index.html        → _output/index.html              → /
//! content/blog/index.html   → _output/blog/index.html         → /blog/
//! content/blog/post1.html   → _output/blog/post1/index.html   → /blog/post1/
//! ```
//!
//! Every page other than an index becomes a directory with its own
//! `index.html`, so served URLs never carry the extension. The page builder
//! and the sitemap both go through this module.

use std::{
    ffi::OsStr,
    path::{Component, Path, PathBuf},
};

/// File name every page is written to.
pub const INDEX_FILE: &str = "index.html";

/// Output path (relative to the output root) for a content path relative to
/// the content root. `extension` is the content extension without the dot.
pub fn output_path(rel: &Path, extension: &str) -> PathBuf {
    let is_index = rel.file_stem() == Some(OsStr::new("index"))
        && rel.extension() == Some(OsStr::new(extension));

    if is_index {
        rel.with_file_name(INDEX_FILE)
    } else {
        rel.with_extension("").join(INDEX_FILE)
    }
}

/// Site URL of an output path: drop a trailing `index.html`, join with `/`
/// regardless of the platform separator, and root it at `/`.
pub fn url_path(output_rel: &Path) -> String {
    let mut segments: Vec<_> = output_rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect();

    let is_dir = segments.last().is_some_and(|s| s == INDEX_FILE);
    if is_dir {
        segments.pop();
    }

    let mut url = String::from("/");
    url.push_str(&segments.join("/"));
    if is_dir && !segments.is_empty() {
        url.push('/');
    }
    url
}
