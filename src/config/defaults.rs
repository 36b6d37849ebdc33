//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

/// Optional config file looked up in the site root.
pub const CONFIG_FILE: &str = "site.toml";

// ============================================================================
// Fixed site layout
// ============================================================================

pub mod dirs {
    pub const CONTENT: &str = "content";
    pub const LAYOUTS: &str = "layouts";
    pub const ASSETS: &str = "assets";
    pub const EXTRA: &str = "extra";
    pub const OUTPUT: &str = "_output";
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use super::super::FrontMatterBackend;

    pub fn extension() -> String {
        "html".into()
    }

    pub fn max_include_depth() -> usize {
        64
    }

    pub fn frontmatter() -> FrontMatterBackend {
        FrontMatterBackend::default()
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        3000
    }
}

// ============================================================================
// [watch] Section Defaults
// ============================================================================

pub mod watch {
    use super::super::WatchBackend;

    /// Lower bound for `debounce_ms`; rebuilds never fire more often than this.
    pub const MIN_DEBOUNCE_MS: u64 = 1000;

    pub fn backend() -> WatchBackend {
        WatchBackend::default()
    }

    pub fn debounce_ms() -> u64 {
        MIN_DEBOUNCE_MS
    }

    pub fn poll_interval_ms() -> u64 {
        1000
    }
}

// ============================================================================
// [sitemap] Section Defaults
// ============================================================================

pub mod sitemap {
    pub fn enable() -> bool {
        true
    }

    pub fn base_url() -> Option<String> {
        None
    }

    pub fn priority() -> f32 {
        0.8
    }

    pub fn root_priority() -> f32 {
        1.0
    }
}
