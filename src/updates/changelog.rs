use crate::config::ResolvedConfig;
use crate::constants::{BETA_MARKER, VERSION_LINE_PREFIX};
use crate::errors::{AppError, AppResult};
use tracing::{debug, info};

/// Builds the changelog URL for a given release.
pub fn changelog_url(base_url: &str, version: &str) -> String {
    format!("{base_url}/{version}/changelog.txt")
}

/// Fetches the changelog text published alongside the reference release.
///
/// The changelog of any release lists the whole version history, so one
/// known-good reference version is enough to enumerate all releases.
///
/// # Errors
///
/// A failed fetch is fatal for the run: no version can be discovered
/// without the changelog.
pub async fn fetch_changelog(
    client: &reqwest::Client,
    config: &ResolvedConfig,
) -> AppResult<String> {
    let url = changelog_url(&config.base_url, &config.reference_version);
    if config.verbose {
        debug!(url = url.as_str(), "Fetching changelog");
    }

    let text = client
        .get(&url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| AppError::NetworkError(format!("Failed to fetch changelog {url}: {e}")))?
        .text()
        .await?;

    Ok(text)
}

/// Parses changelog text and extracts version identifiers, in document order.
///
/// Lines of interest start with `Software Version:`. The version token is
/// the third whitespace field, unless that field is the `Beta` marker, in
/// which case the token follows it. A single leading `V` is stripped, as are
/// carriage returns from CRLF line endings.
pub fn parse_versions(changelog: &str) -> Vec<String> {
    changelog.lines().filter_map(extract_version).collect()
}

fn extract_version(line: &str) -> Option<String> {
    let line = line.trim_end_matches('\r');
    if !line.starts_with(VERSION_LINE_PREFIX) {
        return None;
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    let token = if fields.get(2) == Some(&BETA_MARKER) {
        fields.get(3).copied()?
    } else {
        fields.get(2).copied()?
    };

    let token = token.strip_prefix('V').unwrap_or(token);
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Keeps only the last `n` versions, original order preserved.
pub fn tail(versions: &[String], n: usize) -> &[String] {
    &versions[versions.len().saturating_sub(n)..]
}

/// Discovers the versions to process: fetch, parse, keep the newest tail.
pub async fn discover_versions(
    client: &reqwest::Client,
    config: &ResolvedConfig,
) -> AppResult<Vec<String>> {
    let changelog = fetch_changelog(client, config).await?;
    let all = parse_versions(&changelog);
    let selected = tail(&all, config.tail_count).to_vec();
    info!(
        listed = all.len(),
        selected = selected.len(),
        "Changelog parsed"
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_beta_line_takes_following_token() {
        let changelog = "Software Version: Beta V1.2.3-4\n";
        assert_eq!(parse_versions(changelog), vec!["1.2.3-4".to_string()]);
    }

    #[test]
    fn test_parse_release_line_takes_third_token() {
        let changelog = "Software Version: V2.0.0-1\n";
        assert_eq!(parse_versions(changelog), vec!["2.0.0-1".to_string()]);
    }

    #[test]
    fn test_parse_skips_unrelated_lines() {
        let changelog = "\
Datalogger firmware changelog
Software Version: V2.0.0-1
- fixed logging interval
Release date: 2020-02-02
Software Version: Beta V2.1.0-1
";
        assert_eq!(
            parse_versions(changelog),
            vec!["2.0.0-1".to_string(), "2.1.0-1".to_string()]
        );
    }

    #[test]
    fn test_parse_strips_carriage_returns() {
        let changelog = "Software Version: V3.4.5-6\r\nSoftware Version: Beta V3.5.0-1\r\n";
        assert_eq!(
            parse_versions(changelog),
            vec!["3.4.5-6".to_string(), "3.5.0-1".to_string()]
        );
    }

    #[test]
    fn test_parse_token_without_leading_v_kept_as_is() {
        let changelog = "Software Version: 2.0.0-1\n";
        assert_eq!(parse_versions(changelog), vec!["2.0.0-1".to_string()]);
    }

    #[test]
    fn test_parse_prefix_only_line_yields_nothing() {
        assert!(parse_versions("Software Version:\n").is_empty());
        assert!(parse_versions("Software Version: Beta\n").is_empty());
    }

    #[test]
    fn test_tail_keeps_last_entries_in_order() {
        let versions: Vec<String> = (1..=30).map(|i| format!("1.0.{i}-1")).collect();
        let last = tail(&versions, 23);
        assert_eq!(last.len(), 23);
        assert_eq!(last.first().unwrap(), "1.0.8-1");
        assert_eq!(last.last().unwrap(), "1.0.30-1");
    }

    #[test]
    fn test_tail_shorter_than_n_keeps_everything() {
        let versions = vec!["1.0.0-1".to_string(), "1.0.1-1".to_string()];
        assert_eq!(tail(&versions, 23), versions.as_slice());
    }

    #[test]
    fn test_changelog_url_shape() {
        assert_eq!(
            changelog_url("http://host/datalogger_web/dmc/updates", "3.25.2-1"),
            "http://host/datalogger_web/dmc/updates/3.25.2-1/changelog.txt"
        );
    }
}
