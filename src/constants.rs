// Vendor update endpoint (templated with a version: <BASE>/<version>/changelog.txt etc.)
pub const DEFAULT_BASE_URL: &str = "http://firmware.datalogger-web.com/datalogger_web/dmc/updates";

// Known-good release whose changelog lists the full version history
pub const DEFAULT_REFERENCE_VERSION: &str = "3.25.2-1";

// Changelog lines of interest start with this literal prefix
pub const VERSION_LINE_PREFIX: &str = "Software Version:";

// Marker token for pre-release entries; shifts the version token one field right
pub const BETA_MARKER: &str = "Beta";

// The vendor server answers 200 with this exact body for absent packages
pub const NOT_FOUND_SENTINEL: &str = "not found";

// Resource probed to decide whether a version was actually published
pub const PROBE_PACKAGE: &str = "pkg0.fpk";

// Only the newest releases are worth mirroring by default
pub const DEFAULT_TAIL_COUNT: usize = 23;

// Upper bound on the pkg<N>.fpk index; the real package count per version is unknown
pub const DEFAULT_MAX_PACKAGE_INDEX: u32 = 100;
