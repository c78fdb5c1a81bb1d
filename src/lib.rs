//! dmc-mirror library
//!
//! This crate provides the core functionality for the `dmc-mirror` binary.
//! Keep the crate root minimal — implementation and tests live in their modules.
//!
//! ## Overview
//!
//! The library is organized into modules that handle different aspects of the
//! firmware mirroring workflow:
//!
//! - [`updates`] - Discovers versions from the vendor changelog, probes their
//!   availability, and mirrors package files
//! - [`cli`] - Command-line interface orchestrating discovery and mirroring
//! - [`config`] - Resolved defaults and TOML configuration loading
//! - [`models`] - Probe outcomes and mirror accounting
//! - [`errors`] - Error types used throughout the application
//!
//! ## Example Usage
//!
//! The typical workflow fetches the reference changelog, keeps the newest
//! versions, and mirrors each published one:
//!
//! ```no_run
//! use dmc_mirror::{config::ResolvedConfig, errors::AppResult, updates};
//!
//! # async fn example() -> AppResult<()> {
//! let config = ResolvedConfig::default();
//! let client = reqwest::Client::new();
//!
//! for version in updates::discover_versions(&client, &config).await? {
//!     if updates::probe_version(&client, &config, &version).await.is_available() {
//!         updates::mirror_packages(&client, &version, &config).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod ui;
pub mod updates;
