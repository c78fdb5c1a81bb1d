use crate::config::ResolvedConfig;
use crate::constants::{NOT_FOUND_SENTINEL, PROBE_PACKAGE};
use crate::models::ProbeOutcome;
use tracing::debug;

/// Builds the probe URL (`pkg0.fpk`) for a version.
pub fn probe_url(base_url: &str, version: &str) -> String {
    format!("{base_url}/{version}/{PROBE_PACKAGE}")
}

/// Probes whether a version was actually published.
///
/// The changelog lists versions that were never uploaded to the update
/// server, so each candidate is checked by fetching its first package.
/// Transport failures are reported as [`ProbeOutcome::FetchError`] rather
/// than being conflated with absence.
pub async fn probe_version(
    client: &reqwest::Client,
    config: &ResolvedConfig,
    version: &str,
) -> ProbeOutcome {
    let url = probe_url(&config.base_url, version);
    if config.verbose {
        debug!(url = url.as_str(), "Probing version");
    }

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => return ProbeOutcome::FetchError(e.to_string()),
    };

    let status = response.status().as_u16();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return ProbeOutcome::FetchError(e.to_string()),
    };

    classify_response(status, &body)
}

/// Maps a probe response to an outcome.
///
/// The vendor server signals absence two ways: a plain 404, or a 200 whose
/// body is exactly the `not found` sentinel. Any other success body counts
/// as available, binary package content included.
pub(crate) fn classify_response(status: u16, body: &[u8]) -> ProbeOutcome {
    match status {
        404 => ProbeOutcome::NotFound,
        200..=299 => {
            if body == NOT_FOUND_SENTINEL.as_bytes() {
                ProbeOutcome::NotFound
            } else {
                ProbeOutcome::Available
            }
        }
        _ => ProbeOutcome::FetchError(format!("HTTP {status} from probe")),
    }
}
