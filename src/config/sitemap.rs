//! `[sitemap]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[sitemap]` section in site.toml.
///
/// # Example
/// ```toml
/// [sitemap]
/// base_url = "https://example.com"
/// priority = 0.5
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SitemapConfig {
    /// Write `sitemap.xml` after each build.
    #[serde(default = "defaults::sitemap::enable")]
    #[educe(Default = defaults::sitemap::enable())]
    pub enable: bool,

    /// Absolute site URL prepended to every `<loc>`; root-relative when unset.
    #[serde(default = "defaults::sitemap::base_url")]
    #[educe(Default = defaults::sitemap::base_url())]
    pub base_url: Option<String>,

    /// Priority of every page except `/`, in `0.0..=1.0`.
    #[serde(default = "defaults::sitemap::priority")]
    #[educe(Default = defaults::sitemap::priority())]
    pub priority: f32,

    /// Priority of `/`; never below `priority`.
    #[serde(default = "defaults::sitemap::root_priority")]
    #[educe(Default = defaults::sitemap::root_priority())]
    pub root_priority: f32,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;

    #[test]
    fn test_sitemap_config_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert!(config.sitemap.enable);
        assert_eq!(config.sitemap.base_url, None);
        assert_eq!(config.sitemap.priority, 0.8);
        assert_eq!(config.sitemap.root_priority, 1.0);
    }

    #[test]
    fn test_sitemap_config_custom() {
        let config = r#"
            [sitemap]
            enable = false
            base_url = "https://example.com"
            priority = 0.5
            root_priority = 1.0
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert!(!config.sitemap.enable);
        assert_eq!(config.sitemap.base_url.as_deref(), Some("https://example.com"));
        assert_eq!(config.sitemap.priority, 0.5);
        assert_eq!(config.sitemap.root_priority, 1.0);
    }

    #[test]
    fn test_sitemap_config_rejects_string_priority() {
        let config = "[sitemap]\npriority = \"high\"\n";
        assert!(toml::from_str::<SiteConfig>(config).is_err());
    }
}
