//! Site configuration: fixed directory layout plus an optional `site.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[build]`   | Content extension, include depth, front-matter   |
//! | `[serve]`   | Development server (interface, port)             |
//! | `[watch]`   | Change detection backend, debounce, poll rate    |
//! | `[sitemap]` | Sitemap toggle, base URL, priorities             |
//!
//! Every section is optional; a site without `site.toml` builds with defaults.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! port = 8080
//!
//! [watch]
//! backend = "poll"
//!
//! [sitemap]
//! base_url = "https://example.com"
//! ```

mod build;
pub mod defaults;
mod error;
mod paths;
mod serve;
mod sitemap;
mod watch;

pub use build::{BuildConfig, FrontMatterBackend};
pub use error::ConfigError;
pub use paths::{SitePaths, normalize_path};
pub use serve::ServeConfig;
pub use sitemap::SitemapConfig;
pub use watch::{WatchBackend, WatchConfig};

use crate::cli::Cli;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Root configuration structure representing site.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute directory layout (set after loading)
    #[serde(skip)]
    pub paths: SitePaths,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub sitemap: SitemapConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load `site.toml` (if any) for the site root given on the command line,
    /// apply CLI overrides and validate.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = normalize_path(&cli.directory);
        let config_path = root.join(defaults::CONFIG_FILE);

        let mut config = if config_path.is_file() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.set_root(&root);
        config.update_with_cli(cli);
        config.validate()?;

        Ok(config)
    }

    /// Resolve every site directory against `root`.
    pub fn set_root(&mut self, root: &Path) {
        self.paths = SitePaths::new(root);
    }

    /// Get the root directory path
    #[inline]
    pub fn get_root(&self) -> &Path {
        &self.paths.root
    }

    /// Update config options the CLI can override
    fn update_with_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.serve.port, cli.port.as_ref());
        Self::update_option(&mut self.serve.interface, cli.interface.as_ref());
        if cli.poll {
            self.watch.backend = WatchBackend::Poll;
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Validate the loaded configuration against the site on disk.
    pub fn validate(&self) -> Result<()> {
        if !self.paths.content.is_dir() {
            bail!(ConfigError::MissingContent(self.paths.content.clone()));
        }

        if self.build.extension.is_empty() || self.build.extension.starts_with('.') {
            bail!(ConfigError::Validation(
                "[build.extension] must be a bare extension like \"html\"".into()
            ));
        }

        if self.build.max_include_depth == 0 {
            bail!(ConfigError::Validation(
                "[build.max_include_depth] must be at least 1".into()
            ));
        }

        if self.build.frontmatter == FrontMatterBackend::Yaml && !cfg!(feature = "yaml") {
            bail!(ConfigError::Validation(
                "[build.frontmatter] = \"yaml\" requires the `yaml` feature".into()
            ));
        }

        if self.watch.debounce_ms < defaults::watch::MIN_DEBOUNCE_MS {
            bail!(ConfigError::Validation(format!(
                "[watch.debounce_ms] must be at least {}",
                defaults::watch::MIN_DEBOUNCE_MS
            )));
        }

        if self.watch.poll_interval_ms == 0 {
            bail!(ConfigError::Validation(
                "[watch.poll_interval_ms] must be greater than 0".into()
            ));
        }

        if let Some(base_url) = &self.sitemap.base_url
            && !base_url.starts_with("http")
        {
            bail!(ConfigError::Validation(
                "[sitemap.base_url] must start with http:// or https://".into()
            ));
        }

        let sitemap = &self.sitemap;
        for (key, value) in [
            ("priority", sitemap.priority),
            ("root_priority", sitemap.root_priority),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!(ConfigError::Validation(format!(
                    "[sitemap.{key}] must be between 0.0 and 1.0, got {value}"
                )));
            }
        }
        if sitemap.root_priority < sitemap.priority {
            bail!(ConfigError::Validation(
                "[sitemap.root_priority] must not be lower than [sitemap.priority]".into()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Command;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn cli_for(dir: &Path) -> Cli {
        Cli {
            directory: dir.to_path_buf(),
            command: Command::Build,
            port: None,
            interface: None,
            poll: false,
        }
    }

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(SiteConfig::from_str("[serve\nport = 1").is_err());
    }

    #[test]
    fn test_unknown_top_level_field_rejection() {
        let result = SiteConfig::from_str("[base]\ntitle = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_without_config_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();

        let config = SiteConfig::load(&cli_for(dir.path())).unwrap();

        assert_eq!(config.serve.port, 3000);
        assert!(config.paths.content.ends_with("content"));
        assert!(config.paths.output.ends_with("_output"));
        assert!(config.get_root().is_absolute());
    }

    #[test]
    fn test_load_missing_content_is_fatal() {
        let dir = TempDir::new().unwrap();

        let err = SiteConfig::load(&cli_for(dir.path())).unwrap_err();
        assert!(err.to_string().contains("Content directory not found"));
    }

    #[test]
    fn test_load_reads_site_toml_and_cli_overrides() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();
        fs::write(
            dir.path().join("site.toml"),
            "[serve]\nport = 4000\ninterface = \"0.0.0.0\"\n",
        )
        .unwrap();

        let mut cli = cli_for(dir.path());
        cli.port = Some(5000);
        cli.poll = true;
        let config = SiteConfig::load(&cli).unwrap();

        assert_eq!(config.serve.port, 5000);
        assert_eq!(config.serve.interface, "0.0.0.0");
        assert_eq!(config.watch.backend, WatchBackend::Poll);
    }

    #[test]
    fn test_validate_rejects_short_debounce() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();
        fs::write(dir.path().join("site.toml"), "[watch]\ndebounce_ms = 200\n").unwrap();

        let err = SiteConfig::load(&cli_for(dir.path())).unwrap_err();
        assert!(err.to_string().contains("debounce_ms"));
    }

    #[test]
    fn test_validate_rejects_relative_base_url() {
        let mut config = SiteConfig::default();
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();
        config.set_root(dir.path());
        config.sitemap.base_url = Some("example.com".into());

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_sitemap_priorities() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();
        let mut config = SiteConfig::default();
        config.set_root(dir.path());
        assert!(config.validate().is_ok());

        config.sitemap.priority = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[sitemap.priority]"));

        config.sitemap.priority = -0.1;
        assert!(config.validate().is_err());

        config.sitemap.priority = f32::NAN;
        assert!(config.validate().is_err());

        config.sitemap.priority = 0.9;
        config.sitemap.root_priority = 0.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[sitemap.root_priority]"));

        config.sitemap.root_priority = 0.9;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_set_root() {
        let mut config = SiteConfig::default();
        config.set_root(Path::new("/custom/path"));
        assert_eq!(config.get_root(), Path::new("/custom/path"));
        assert_eq!(config.paths.layouts, PathBuf::from("/custom/path/layouts"));
    }
}
