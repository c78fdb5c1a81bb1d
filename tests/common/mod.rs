//! Common test utilities for integration tests

/// Builds a changelog document from (version, is_beta) pairs, with the
/// surrounding prose lines a real vendor changelog carries.
#[allow(dead_code)]
pub fn build_changelog(entries: &[(&str, bool)]) -> String {
    let mut text = String::from("Datalogger firmware changelog\n\n");
    for (version, beta) in entries {
        if *beta {
            text.push_str(&format!("Software Version: Beta V{version}\n"));
        } else {
            text.push_str(&format!("Software Version: V{version}\n"));
        }
        text.push_str("- assorted fixes\n\n");
    }
    text
}

/// Changelog sample with one release and one beta entry, CRLF line endings.
#[allow(dead_code)]
pub const SAMPLE_CRLF_CHANGELOG: &str =
    "Software Version: V2.0.0-1\r\nnot a version line\r\nSoftware Version: Beta V2.1.0-3\r\n";
