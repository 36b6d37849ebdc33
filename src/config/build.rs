//! `[build]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// Which front-matter backend parses the `---` block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontMatterBackend {
    /// YAML when compiled with the `yaml` feature, line-oriented otherwise (default).
    #[default]
    Auto,
    /// Structured YAML parser.
    Yaml,
    /// `key: value` per line, split on the first colon.
    Lines,
}

/// `[build]` section in site.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// extension = "html"
/// max_include_depth = 64
/// frontmatter = "lines"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Extension (without dot) of files under `content/` that become pages.
    #[serde(default = "defaults::build::extension")]
    #[educe(Default = defaults::build::extension())]
    pub extension: String,

    /// Include nesting limit; deeper chains fail the page as a cycle.
    #[serde(default = "defaults::build::max_include_depth")]
    #[educe(Default = defaults::build::max_include_depth())]
    pub max_include_depth: usize,

    /// Front-matter parser selection.
    #[serde(default = "defaults::build::frontmatter")]
    #[educe(Default = defaults::build::frontmatter())]
    pub frontmatter: FrontMatterBackend,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;
    use super::FrontMatterBackend;

    #[test]
    fn test_build_config_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert_eq!(config.build.extension, "html");
        assert_eq!(config.build.max_include_depth, 64);
        assert_eq!(config.build.frontmatter, FrontMatterBackend::Auto);
    }

    #[test]
    fn test_build_config_full() {
        let config = r#"
            [build]
            extension = "htm"
            max_include_depth = 8
            frontmatter = "lines"
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(config.build.extension, "htm");
        assert_eq!(config.build.max_include_depth, 8);
        assert_eq!(config.build.frontmatter, FrontMatterBackend::Lines);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let config = r#"
            [build]
            frontmatter = "toml"
        "#;
        assert!(toml::from_str::<SiteConfig>(config).is_err());
    }
}
