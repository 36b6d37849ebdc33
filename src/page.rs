//! Rendering of a single content file.
//!
//! # Pipeline
//!
//! ```text
//! raw file ── frontmatter::parse ──► (meta, body)
//!                                      │
//!              meta["layout"] found? ──┤
//!                 yes: meta["content"] = render(body)
//!                      body = raw layout text
//!                                      │
//!                          render(body) ◄┘   includes, then variables
//!                                      │
//!                    route::output_path ──► RenderedPage
//! ```
//!
//! The layout places the page with `<template variable="content">`.
//! Problems that leave a usable page (bad front-matter, missing include,
//! missing layout) are returned as [`Warning`]s; anything else is a
//! [`PageError`] and the page is skipped by the caller.

use crate::{
    config::SiteConfig,
    frontmatter::{self, MetaParser, MetaValue, Metadata},
    route,
    template::{Resolver, TemplateError},
};
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Metadata key selecting the layout file.
pub const LAYOUT_KEY: &str = "layout";
/// Metadata key the rendered page body is stored under when a layout applies.
pub const CONTENT_KEY: &str = "content";

/// A non-fatal problem found while rendering a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    FrontMatter(String),
    MissingInclude(String),
    MissingLayout(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrontMatter(msg) => write!(f, "{msg}, using empty metadata"),
            Self::MissingInclude(name) => write!(f, "include file not found: {name}"),
            Self::MissingLayout(name) => write!(f, "layout {name} not found, rendering without it"),
        }
    }
}

/// Errors that prevent a page from being written.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("failed to read `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{}` is outside the content directory", path.display())]
    OutsideContent { path: PathBuf },

    #[error("failed to render `{}`", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },
}

/// Output of [`PageBuilder::render`].
#[derive(Debug)]
pub struct Rendered {
    pub html: String,
    pub meta: Metadata,
    pub warnings: Vec<Warning>,
}

/// A page ready to be written.
#[derive(Debug)]
pub struct RenderedPage {
    pub source: PathBuf,
    /// Relative to the output root.
    pub output: PathBuf,
    pub html: String,
    pub meta: Metadata,
    pub warnings: Vec<Warning>,
}

/// Renders content files of one site.
pub struct PageBuilder {
    content: PathBuf,
    extension: String,
    resolver: Resolver,
    parser: Box<dyn MetaParser>,
}

impl PageBuilder {
    pub fn new(config: &SiteConfig) -> Self {
        Self::with_parts(
            &config.paths.content,
            &config.build.extension,
            Resolver::new(&config.paths.layouts, config.build.max_include_depth),
            frontmatter::select_parser(config.build.frontmatter),
        )
    }

    pub fn with_parts(
        content: &Path,
        extension: &str,
        resolver: Resolver,
        parser: Box<dyn MetaParser>,
    ) -> Self {
        Self {
            content: content.to_path_buf(),
            extension: extension.to_owned(),
            resolver,
            parser,
        }
    }

    /// Name of the active front-matter backend.
    pub fn parser_name(&self) -> &'static str {
        self.parser.name()
    }

    /// Read, render and route one content file.
    pub fn build(&self, path: &Path) -> Result<RenderedPage, PageError> {
        let rel = path
            .strip_prefix(&self.content)
            .map_err(|_| PageError::OutsideContent {
                path: path.to_path_buf(),
            })?;

        let raw = fs::read_to_string(path).map_err(|source| PageError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let Rendered {
            html,
            meta,
            warnings,
        } = self.render(&raw).map_err(|source| PageError::Template {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(RenderedPage {
            source: path.to_path_buf(),
            output: route::output_path(rel, &self.extension),
            html,
            meta,
            warnings,
        })
    }

    /// Render raw file content: front-matter, optional layout, then a final
    /// include + variable pass over whatever body is left.
    pub fn render(&self, raw: &str) -> Result<Rendered, TemplateError> {
        let parsed = frontmatter::parse(raw, self.parser.as_ref());
        let mut warnings: Vec<Warning> = parsed
            .warning
            .map(|e| Warning::FrontMatter(e.to_string()))
            .into_iter()
            .collect();
        let mut meta = parsed.meta;
        let mut layout_source = None;

        if let Some(layout) = meta.get(LAYOUT_KEY).map(ToString::to_string) {
            match self.resolver.locate(&layout) {
                Some(path) => {
                    let inner = self.resolver.render(parsed.body, &meta)?;
                    warnings.extend(inner.missing.into_iter().map(Warning::MissingInclude));
                    meta.insert(CONTENT_KEY.to_owned(), MetaValue::Text(inner.html));

                    let source = fs::read_to_string(&path)
                        .map_err(|source| TemplateError::Io { path, source })?;
                    layout_source = Some(source);
                }
                None => warnings.push(Warning::MissingLayout(layout)),
            }
        }

        let body = layout_source.as_deref().unwrap_or(parsed.body);
        let outer = self.resolver.render(body, &meta)?;
        warnings.extend(outer.missing.into_iter().map(Warning::MissingInclude));

        Ok(Rendered {
            html: outer.html,
            meta,
            warnings,
        })
    }
}
