//! Files generated from the set of built pages rather than from one source.

pub mod sitemap;

pub use sitemap::build_sitemap;
