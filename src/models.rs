/// Outcome of probing a version's `pkg0.fpk` resource.
///
/// Replaces the sentinel-body boolean the vendor protocol implies with an
/// explicit tagged status, so genuine transport failures are not mistaken
/// for published versions.
#[derive(Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The probe package exists; the version can be mirrored.
    Available,
    /// The server reported the version absent (404 or sentinel body).
    NotFound,
    /// The probe itself failed; availability is unknown.
    FetchError(String),
}

impl ProbeOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Per-version accounting for one mirror pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MirrorStats {
    /// Packages fetched and written to disk this run
    pub downloaded: usize,
    /// Packages already on disk, skipped without a request
    pub already_present: usize,
    /// Candidate indices the server answered 404 for
    pub absent: usize,
    /// Packages that failed after retries
    pub failed: usize,
}

impl MirrorStats {
    /// Folds another version's stats into a run-wide total.
    pub fn merge(&mut self, other: &MirrorStats) {
        self.downloaded += other.downloaded;
        self.already_present += other.already_present;
        self.absent += other.absent;
        self.failed += other.failed;
    }
}
