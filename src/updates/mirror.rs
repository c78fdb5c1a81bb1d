use crate::config::ResolvedConfig;
use crate::errors::{AppError, AppResult};
use crate::models::MirrorStats;
use crate::ui;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What happened to one candidate package URL.
#[derive(Debug)]
enum PackageFetch {
    Downloaded,
    /// The server 404ed; the index is past the version's real package count.
    Absent,
}

/// Result type for parallel download tasks.
type DownloadTaskResult = Result<(String, Result<PackageFetch, String>), AppError>;

/// Builds the candidate package URLs for a version, `pkg0.fpk` through
/// `pkg<max_index>.fpk` inclusive, in ascending index order.
///
/// The real package count per version is unknown up front; indices past it
/// are expected to 404 during mirroring.
pub fn package_urls(base_url: &str, version: &str, max_index: u32) -> Vec<String> {
    (0..=max_index)
        .map(|i| format!("{base_url}/{version}/pkg{i}.fpk"))
        .collect()
}

/// Maps a remote URL to its local mirror path: `<root>/<host>/<path...>`,
/// the same layout a recursive mirroring tool would produce.
pub fn mirror_path(root: &Path, url: &str) -> AppResult<PathBuf> {
    let parsed = url::Url::parse(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::UrlError(format!("No host in {url}")))?;

    let mut path = root.join(host);
    if let Some(segments) = parsed.path_segments() {
        for segment in segments.filter(|s| !s.is_empty()) {
            path.push(segment);
        }
    }
    Ok(path)
}

/// Extracts HTTP status code from error message if present.
///
/// Looks for the pattern "HTTP {status_code}:" in the error message.
fn extract_status_code(msg: &str) -> Option<u16> {
    let prefix = "HTTP ";
    if let Some(start) = msg.find(prefix) {
        let start = start + prefix.len();
        let end = msg[start..].find(':').unwrap_or(msg[start..].len());
        msg[start..start + end].trim().parse().ok()
    } else {
        None
    }
}

/// Determines if an error should trigger a retry attempt.
///
/// Returns `true` for retryable errors (network errors, timeouts, 5xx HTTP
/// status codes). Returns `false` for 4xx client errors and local failures.
fn should_retry(error: &AppError) -> bool {
    match error {
        AppError::NetworkError(msg) => {
            if let Some(status_code) = extract_status_code(msg) {
                status_code >= 500
            } else {
                // No status code means a transport or timeout error
                true
            }
        }
        AppError::IoError(_) => false,
        AppError::ParseError(_) => false,
        AppError::UrlError(_) => false,
        AppError::InvalidInput(_) => false,
    }
}

/// Configuration for retry behavior.
struct RetryConfig {
    max_retries: u32,
    initial_delay_ms: u64,
    max_delay_ms: u64,
}

/// Calculates exponential backoff delay in milliseconds.
///
/// Formula: `min(initial_delay * 2^attempt, max_delay)`
///
/// The exponent is clamped so large retry counts cannot overflow the shift.
fn calculate_backoff(attempt: u32, config: &RetryConfig) -> u64 {
    let delay = config
        .initial_delay_ms
        .saturating_mul(2_u64.pow(attempt.min(20)));
    delay.min(config.max_delay_ms)
}

async fn download_with_retry(
    client: &reqwest::Client,
    url: &str,
    tmp_path: &Path,
    file_path: &Path,
    filename: &str,
    retry_config: &RetryConfig,
) -> AppResult<PackageFetch> {
    let mut last_error: Option<AppError> = None;

    for attempt in 0..=retry_config.max_retries {
        match download_single_package(client, url, tmp_path, file_path, filename).await {
            Ok(fetch) => return Ok(fetch),
            Err(e) => {
                if attempt < retry_config.max_retries && should_retry(&e) {
                    let delay_ms = calculate_backoff(attempt, retry_config);
                    warn!(
                        filename = filename,
                        attempt = attempt + 1,
                        max_retries = retry_config.max_retries + 1,
                        delay_ms = delay_ms,
                        error = %e,
                        "Retrying download after error"
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                    last_error = Some(e);
                    continue;
                }
                return Err(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        AppError::NetworkError(format!(
            "Download failed after {} retries (no error recorded)",
            retry_config.max_retries + 1
        ))
    }))
}

/// Downloads a single package file.
///
/// A 404 is not an error here: candidate indices past the version's real
/// package count are expected to be absent.
async fn download_single_package(
    client: &reqwest::Client,
    url: &str,
    tmp_path: &Path,
    file_path: &Path,
    filename: &str,
) -> AppResult<PackageFetch> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::NetworkError(format!("Failed to download {filename}: {e}")))?;

    let status = response.status();
    if status.as_u16() == 404 {
        return Ok(PackageFetch::Absent);
    }

    let mut response = response.error_for_status().map_err(|e| {
        // Include status code in error message for retry logic
        let status_code = status.as_u16();
        AppError::NetworkError(format!(
            "HTTP {status_code}: Failed to download {filename}: {e}"
        ))
    })?;

    let mut file = File::create(tmp_path).await.map_err(|e| {
        AppError::IoError(format!(
            "Failed to create temp file {}: {}",
            tmp_path.display(),
            e
        ))
    })?;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await.map_err(|e| {
            AppError::IoError(format!(
                "Failed to write to temp file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
    }

    // Ensure the file is closed before renaming
    drop(file);

    // Atomically move the temp file to the final destination
    fs::rename(tmp_path, file_path).await.map_err(|e| {
        AppError::IoError(format!(
            "Failed to rename temp file {} to {}: {}",
            tmp_path.display(),
            file_path.display(),
            e
        ))
    })?;

    Ok(PackageFetch::Downloaded)
}

/// Mirrors one version's packages into the local tree.
///
/// # Behavior
///
/// - **Atomic downloads**: files land in `.part` temp files and are renamed
///   when complete, so the mirror never holds partial packages.
/// - **Skip existing**: files already present on disk are not re-fetched.
/// - **Expected absences**: indices past the real package count 404 and are
///   counted, not reported as failures.
/// - **Best effort**: individual package failures are retried, then recorded
///   in the returned [`MirrorStats`]; they never abort the version.
///
/// # Errors
///
/// Returns an error only for local problems: directory creation, progress
/// bar setup, or malformed URLs.
pub async fn mirror_packages(
    client: &reqwest::Client,
    version: &str,
    config: &ResolvedConfig,
) -> AppResult<MirrorStats> {
    let urls = package_urls(&config.base_url, version, config.max_package_index);

    // Pair every URL with its local path; all of a version's packages share
    // one directory.
    let mut candidates: Vec<(String, PathBuf)> = Vec::with_capacity(urls.len());
    for url in urls {
        let path = mirror_path(&config.output_dir, &url)?;
        candidates.push((url, path));
    }

    let mut stats = MirrorStats::default();

    let to_fetch: Vec<(String, PathBuf)> = candidates
        .into_iter()
        .filter(|(_, path)| {
            if path.exists() {
                stats.already_present += 1;
                false
            } else {
                true
            }
        })
        .collect();

    if to_fetch.is_empty() {
        info!(
            version = version,
            present = stats.already_present,
            "All packages already mirrored, skipping version"
        );
        return Ok(stats);
    }

    if let Some(parent) = to_fetch[0].1.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::IoError(format!("Failed to create directory: {e}")))?;
    }

    let pb = ui::create_progress_bar(to_fetch.len() as u64)?;

    info!(
        version = version,
        candidates = to_fetch.len(),
        present = stats.already_present,
        "Mirroring packages"
    );

    let semaphore = Arc::new(Semaphore::new(config.concurrent_downloads));
    let client = Arc::new(client.clone());
    let pb = Arc::new(pb);

    let retry_max_retries = config.max_retries;
    let retry_initial_delay_ms = config.retry_initial_delay_ms;
    let retry_max_delay_ms = config.retry_max_delay_ms;
    let verbose = config.verbose;

    let mut handles: Vec<JoinHandle<DownloadTaskResult>> = Vec::with_capacity(to_fetch.len());

    for (url, file_path) in to_fetch {
        let semaphore = semaphore.clone();
        let client = client.clone();
        let pb = pb.clone();

        let filename = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.clone());

        let handle = tokio::spawn(async move {
            let tmp_path = file_path.with_extension("fpk.part");

            let _permit = semaphore.acquire().await.map_err(|e| {
                AppError::IoError(format!("Failed to acquire semaphore permit: {e}"))
            })?;

            // Remove stale tmp file if present (best-effort)
            if tmp_path.exists() {
                if let Err(e) = fs::remove_file(&tmp_path).await {
                    warn!(
                        file_path = %tmp_path.display(),
                        error = %e,
                        "Failed to remove stale temp file"
                    );
                }
            }

            if verbose {
                debug!(url = url.as_str(), "Fetching package");
            }
            pb.set_message(format!("Fetching {filename}..."));

            let retry_config = RetryConfig {
                max_retries: retry_max_retries,
                initial_delay_ms: retry_initial_delay_ms,
                max_delay_ms: retry_max_delay_ms,
            };

            let result =
                download_with_retry(&client, &url, &tmp_path, &file_path, &filename, &retry_config)
                    .await;

            match result {
                Ok(fetch) => {
                    if matches!(fetch, PackageFetch::Downloaded) {
                        pb.set_message(format!("Completed {filename}"));
                    }
                    Ok((filename, Ok(fetch)))
                }
                Err(e) => {
                    warn!(
                        filename = filename.as_str(),
                        error = %e,
                        "Failed to download package"
                    );
                    pb.set_message(format!("Failed {filename}"));
                    Ok((filename, Err(e.to_string())))
                }
            }
        });

        handles.push(handle);
    }

    let mut errors: Vec<String> = Vec::new();

    for handle in handles {
        pb.inc(1);

        match handle.await {
            Ok(Ok((filename, outcome))) => match outcome {
                Ok(PackageFetch::Downloaded) => stats.downloaded += 1,
                Ok(PackageFetch::Absent) => {
                    stats.absent += 1;
                    debug!(filename = filename.as_str(), "Package absent on server");
                }
                Err(msg) => {
                    stats.failed += 1;
                    errors.push(format!("{filename}: {msg}"));
                }
            },
            Ok(Err(e)) => {
                stats.failed += 1;
                errors.push(format!("Task error: {e}"));
            }
            Err(e) => {
                stats.failed += 1;
                errors.push(format!("Task join error: {e}"));
            }
        }
    }

    if errors.is_empty() {
        pb.finish_with_message(format!(
            "Downloaded {} package(s), {} absent",
            stats.downloaded, stats.absent
        ));
        info!(
            version = version,
            downloaded = stats.downloaded,
            absent = stats.absent,
            present = stats.already_present,
            "Version mirrored"
        );
    } else {
        pb.finish_with_message(format!(
            "Downloaded {} package(s), {} failed",
            stats.downloaded,
            errors.len()
        ));
        warn!(
            version = version,
            downloaded = stats.downloaded,
            failed = errors.len(),
            errors = errors.join("; ").as_str(),
            "Version mirrored with errors"
        );
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://firmware.datalogger-web.com/datalogger_web/dmc/updates";

    #[test]
    fn test_package_urls_inclusive_range_in_order() {
        let urls = package_urls(BASE, "9.9.9-9", 100);
        assert_eq!(urls.len(), 101);
        assert_eq!(urls.first().unwrap(), &format!("{BASE}/9.9.9-9/pkg0.fpk"));
        assert_eq!(urls.last().unwrap(), &format!("{BASE}/9.9.9-9/pkg100.fpk"));
        for (i, url) in urls.iter().enumerate() {
            assert_eq!(url, &format!("{BASE}/9.9.9-9/pkg{i}.fpk"));
        }
    }

    #[test]
    fn test_package_urls_configurable_bound() {
        assert_eq!(package_urls(BASE, "1.0.0-1", 0).len(), 1);
        assert_eq!(package_urls(BASE, "1.0.0-1", 5).len(), 6);
    }

    #[test]
    fn test_mirror_path_host_and_path_layout() {
        let path = mirror_path(
            Path::new("data/mirror"),
            "http://firmware.datalogger-web.com/datalogger_web/dmc/updates/9.9.9-9/pkg0.fpk",
        )
        .unwrap();
        assert_eq!(
            path,
            Path::new(
                "data/mirror/firmware.datalogger-web.com/datalogger_web/dmc/updates/9.9.9-9/pkg0.fpk"
            )
        );
    }

    #[test]
    fn test_mirror_path_rejects_invalid_url() {
        assert!(mirror_path(Path::new("data/mirror"), "not a url").is_err());
    }

    #[test]
    fn test_extract_status_code() {
        assert_eq!(extract_status_code("HTTP 503: Failed to download"), Some(503));
        assert_eq!(extract_status_code("Connection refused"), None);
    }

    #[test]
    fn test_should_retry_on_server_errors_only() {
        assert!(should_retry(&AppError::NetworkError(
            "HTTP 500: Failed to download pkg3.fpk".to_string()
        )));
        assert!(!should_retry(&AppError::NetworkError(
            "HTTP 403: Failed to download pkg3.fpk".to_string()
        )));
        // Transport errors carry no status code and are retried
        assert!(should_retry(&AppError::NetworkError(
            "connection reset by peer".to_string()
        )));
        assert!(!should_retry(&AppError::IoError("disk full".to_string())));
    }

    #[test]
    fn test_calculate_backoff_caps_at_max() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 10000,
        };
        assert_eq!(calculate_backoff(0, &config), 1000);
        assert_eq!(calculate_backoff(1, &config), 2000);
        assert_eq!(calculate_backoff(2, &config), 4000);
        assert_eq!(calculate_backoff(4, &config), 10000);
    }

    #[test]
    fn test_calculate_backoff_large_attempt_does_not_overflow() {
        let config = RetryConfig {
            max_retries: 100,
            initial_delay_ms: 1000,
            max_delay_ms: 10000,
        };
        assert_eq!(calculate_backoff(64, &config), 10000);
        assert_eq!(calculate_backoff(u32::MAX, &config), 10000);
    }
}
