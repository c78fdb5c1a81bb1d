//! Discovery, probing, and mirroring of firmware update packages.
//!
//! This module covers the three steps of a run: enumerate versions from the
//! remote changelog, probe each one for availability, and mirror the
//! published package files. The main entry points are [`discover_versions`],
//! [`probe_version`] and [`mirror_packages`].

mod changelog;
mod mirror;
mod probe;

// Re-export public API
pub use changelog::{changelog_url, discover_versions, fetch_changelog, parse_versions, tail};
pub use mirror::{mirror_packages, mirror_path, package_urls};
pub use probe::{probe_url, probe_version};
