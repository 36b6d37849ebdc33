//! Include expansion and variable substitution.
//!
//! Two directives are recognized anywhere in HTML text:
//!
//! ```html
//! <template include="header.html">
//! <template variable="title" default="Untitled">
//! ```
//!
//! `include` is replaced by the named file under the layouts root, itself
//! fully expanded. `variable` is replaced by the page's metadata value, the
//! `default` attribute, or nothing. Includes always run before variables, so
//! variables inside an included fragment see the including page's metadata.
//!
//! Both passes take an input string and return a new one; neither touches
//! shared state, so each can be used and tested on its own.

use crate::frontmatter::Metadata;
use regex::{Captures, Regex};
use std::{
    fs, io,
    path::{Component, Path, PathBuf},
    sync::LazyLock,
};
use thiserror::Error;

static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<template\s+include=["'](.*?)["']\s*/?>"#).expect("valid include regex")
});

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<template\s+variable=["'](.*?)["'](?:\s+default=["'](.*?)["'])?\s*/?>"#)
        .expect("valid variable regex")
});

/// Errors that fail the page being rendered.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Include nesting went past the configured limit, which in practice
    /// means a file includes itself directly or through others.
    #[error("include depth limit ({limit}) exceeded, possible cycle: {chain}")]
    Cycle { limit: usize, chain: String },

    #[error("failed to read template `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Output of a resolver pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Expanded {
    pub html: String,
    /// Include names that did not resolve to a file, in document order.
    pub missing: Vec<String>,
}

/// Resolves directives against one layouts directory.
#[derive(Debug, Clone)]
pub struct Resolver {
    layouts: PathBuf,
    max_depth: usize,
}

impl Resolver {
    pub fn new(layouts: impl Into<PathBuf>, max_depth: usize) -> Self {
        Self {
            layouts: layouts.into(),
            max_depth,
        }
    }

    /// Path of template `name` under the layouts root, if it is a file.
    ///
    /// Names that are absolute or climb out with `..` never resolve.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        let rel = Path::new(name);
        let confined = !name.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !confined {
            return None;
        }

        let path = self.layouts.join(rel);
        path.is_file().then_some(path)
    }

    /// Full resolver pass: includes, then variables.
    pub fn render(&self, input: &str, meta: &Metadata) -> Result<Expanded, TemplateError> {
        let Expanded { html, missing } = self.expand_includes(input)?;
        Ok(Expanded {
            html: substitute_variables(&html, meta),
            missing,
        })
    }

    /// Replace every include directive with the expanded file contents.
    ///
    /// Missing targets become empty strings and are reported in
    /// [`Expanded::missing`].
    pub fn expand_includes(&self, input: &str) -> Result<Expanded, TemplateError> {
        let mut missing = Vec::new();
        let mut chain = Vec::new();
        let html = self.expand(input, &mut chain, &mut missing)?;
        Ok(Expanded { html, missing })
    }

    fn expand(
        &self,
        input: &str,
        chain: &mut Vec<String>,
        missing: &mut Vec<String>,
    ) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(input.len());
        let mut last = 0;

        for caps in INCLUDE.captures_iter(input) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&input[last..whole.start()]);
            last = whole.end();

            let name = name.as_str();
            let Some(path) = self.locate(name) else {
                missing.push(name.to_owned());
                continue;
            };

            if chain.len() >= self.max_depth {
                chain.push(name.to_owned());
                return Err(TemplateError::Cycle {
                    limit: self.max_depth,
                    chain: chain.join(" -> "),
                });
            }

            let source = fs::read_to_string(&path)
                .map_err(|source| TemplateError::Io { path, source })?;

            chain.push(name.to_owned());
            let expanded = self.expand(&source, chain, missing)?;
            chain.pop();

            out.push_str(&expanded);
        }

        out.push_str(&input[last..]);
        Ok(out)
    }
}

/// Replace every variable directive with its metadata value.
///
/// Lookup is by exact key: `a.b` names a key literally spelled `a.b`.
/// Substituted values are not rescanned for directives.
pub fn substitute_variables(input: &str, meta: &Metadata) -> String {
    VARIABLE
        .replace_all(input, |caps: &Captures| {
            let name = caps.get(1).map_or("", |m| m.as_str());
            match meta.get(name) {
                Some(value) => value.to_string(),
                None => caps.get(2).map_or("", |m| m.as_str()).to_owned(),
            }
        })
        .into_owned()
}
