//! Front-matter splitting and parsing.
//!
//! A content file may open with a metadata block:
//!
//! ```text
//! ---
//! title: Hello
//! layout: base.html
//! ---
//! <p>body</p>
//! ```
//!
//! The block is handed to a [`MetaParser`] chosen once at startup:
//! [`YamlParser`] (feature `yaml`) or the line-oriented [`LineParser`].
//! Both produce the same [`Metadata`] shape for plain `key: value` blocks.
//! A block that fails to parse is not fatal: the page gets empty metadata
//! and the caller receives the error as a warning.

use crate::config::FrontMatterBackend;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt,
    sync::LazyLock,
};
use thiserror::Error;

/// Leading `---` block, closed by a `---` line. The block itself may be empty.
static FRONT_MATTER: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?s)\A---[ \t]*\r?\n(?:(.*?)\r?\n)??---[ \t]*(?:\r?\n|\z)")
        .expect("valid front-matter regex")
});

/// Page metadata: string keys to text or nested values.
pub type Metadata = BTreeMap<String, MetaValue>;

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Any scalar (strings, numbers, booleans) in its textual form.
    Text(String),
    List(Vec<MetaValue>),
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    /// The text of a scalar value, `None` for lists and maps.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Scalars print as-is; lists and maps print as compact JSON.
impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            nested => {
                let json = serde_json::to_string(nested).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// A metadata block the active backend could not understand.
#[derive(Debug, Error)]
#[error("{backend} front-matter parse error: {message}")]
pub struct FrontMatterError {
    pub backend: &'static str,
    pub message: String,
}

/// Turns the text between the `---` delimiters into [`Metadata`].
pub trait MetaParser: Send + Sync {
    /// Short backend name used in diagnostics.
    fn name(&self) -> &'static str;

    fn parse(&self, block: &str) -> Result<Metadata, FrontMatterError>;
}

/// Pick the parser for the configured backend.
pub fn select_parser(backend: FrontMatterBackend) -> Box<dyn MetaParser> {
    match backend {
        FrontMatterBackend::Lines => Box::new(LineParser),
        #[cfg(feature = "yaml")]
        FrontMatterBackend::Auto | FrontMatterBackend::Yaml => Box::new(YamlParser),
        #[cfg(not(feature = "yaml"))]
        FrontMatterBackend::Auto | FrontMatterBackend::Yaml => Box::new(LineParser),
    }
}

/// Result of splitting one content file.
#[derive(Debug)]
pub struct FrontMatter<'a> {
    pub meta: Metadata,
    pub body: &'a str,
    /// Set when a block was present but malformed; `meta` is then empty.
    pub warning: Option<FrontMatterError>,
}

/// Split `raw` into metadata and body.
///
/// Without a leading block the whole input is the body, byte for byte.
pub fn parse<'a>(raw: &'a str, parser: &dyn MetaParser) -> FrontMatter<'a> {
    let Some(caps) = FRONT_MATTER.captures(raw) else {
        return FrontMatter {
            meta: Metadata::new(),
            body: raw,
            warning: None,
        };
    };

    let end = caps.get(0).map_or(0, |m| m.end());
    let block = caps.get(1).map_or("", |m| m.as_str());
    let body = &raw[end..];

    match parser.parse(block) {
        Ok(meta) => FrontMatter {
            meta,
            body,
            warning: None,
        },
        Err(err) => FrontMatter {
            meta: Metadata::new(),
            body,
            warning: Some(err),
        },
    }
}

// ============================================================================
// Line-oriented backend
// ============================================================================

/// `key: value` per line, split on the first colon and trimmed.
///
/// Lines without a colon and `#` comments are ignored. A value wrapped in
/// matching quotes is unquoted. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineParser;

impl MetaParser for LineParser {
    fn name(&self) -> &'static str {
        "lines"
    }

    fn parse(&self, block: &str) -> Result<Metadata, FrontMatterError> {
        let meta = block
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim(), unquote(value.trim())))
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.to_owned(), MetaValue::from(value)))
            .collect();
        Ok(meta)
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    match bytes {
        [first @ (b'"' | b'\''), .., last] if first == last && bytes.len() >= 2 => {
            &value[1..value.len() - 1]
        }
        _ => value,
    }
}

// ============================================================================
// YAML backend
// ============================================================================

/// Structured YAML parser. The block must be a mapping (or empty).
///
/// Scalars keep their source text: `1.10`, `0x1F` and `True` come out exactly
/// as written, the same as with [`LineParser`]. Only quoting is removed.
#[cfg(feature = "yaml")]
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

#[cfg(feature = "yaml")]
impl MetaParser for YamlParser {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn parse(&self, block: &str) -> Result<Metadata, FrontMatterError> {
        use serde::de::DeserializeSeed;
        use serde_yaml_ng::Value;

        let error = |message: String| FrontMatterError {
            backend: self.name(),
            message,
        };

        // First pass: structure only. Second pass: re-read with that structure
        // so every scalar goes through `deserialize_str`.
        let shape: Value = serde_yaml_ng::from_str(block).map_err(|e| error(e.to_string()))?;
        match shape {
            Value::Null => Ok(Metadata::new()),
            Value::Mapping(ref map) => yaml::MapVisitor(map)
                .deserialize(serde_yaml_ng::Deserializer::from_str(block))
                .map_err(|e| error(e.to_string())),
            other => Err(error(format!(
                "expected a mapping of keys to values, found {}",
                yaml::kind(&other)
            ))),
        }
    }
}

#[cfg(feature = "yaml")]
mod yaml {
    use super::{MetaValue, Metadata};
    use serde::{
        Deserialize,
        de::{DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor},
    };
    use serde_yaml_ng::{Mapping, Value};
    use std::fmt;

    /// Reads one node whose shape is already known.
    struct Shaped<'s>(&'s Value);

    impl<'de> DeserializeSeed<'de> for Shaped<'_> {
        type Value = MetaValue;

        fn deserialize<D: Deserializer<'de>>(self, de: D) -> Result<MetaValue, D::Error> {
            match self.0 {
                Value::Sequence(items) => de.deserialize_seq(SeqVisitor(items)),
                Value::Mapping(map) => de.deserialize_map(MapVisitor(map)).map(MetaValue::Map),
                Value::Tagged(tagged) => Shaped(&tagged.value).deserialize(de),
                _ => String::deserialize(de).map(MetaValue::Text),
            }
        }
    }

    struct SeqVisitor<'s>(&'s [Value]);

    impl<'de> Visitor<'de> for SeqVisitor<'_> {
        type Value = MetaValue;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a sequence")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<MetaValue, A::Error> {
            let mut items = Vec::with_capacity(self.0.len());
            for shape in self.0 {
                match seq.next_element_seed(Shaped(shape))? {
                    Some(item) => items.push(item),
                    None => break,
                }
            }
            Ok(MetaValue::List(items))
        }
    }

    /// Mapping with text keys; entries with collection keys are dropped.
    pub struct MapVisitor<'s>(pub &'s Mapping);

    impl<'de> Visitor<'de> for MapVisitor<'_> {
        type Value = Metadata;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Metadata, A::Error> {
            let mut meta = Metadata::new();
            for (key_shape, value_shape) in self.0 {
                let Some(key) = map.next_key_seed(Shaped(key_shape))? else {
                    break;
                };
                let value = map.next_value_seed(Shaped(value_shape))?;
                if let MetaValue::Text(key) = key {
                    meta.insert(key, value);
                }
            }
            Ok(meta)
        }
    }

    impl<'de> DeserializeSeed<'de> for MapVisitor<'_> {
        type Value = Metadata;

        fn deserialize<D: Deserializer<'de>>(self, de: D) -> Result<Metadata, D::Error> {
            de.deserialize_map(self)
        }
    }

    pub fn kind(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Sequence(_) => "a sequence",
            Value::Mapping(_) => "a mapping",
            Value::Tagged(_) => "a tagged value",
        }
    }
}
