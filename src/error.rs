use thiserror::Error;

/// Errors that abort a whole fill operation.
///
/// Per-source failures are deliberately NOT represented here: a source that
/// cannot be located is skipped with a warning (see [`SourceError`] and
/// `resolver::build_mapping`). `FillError` covers the cases where no sensible
/// output can be produced at all.
#[derive(Debug, Error)]
pub enum FillError {
    /// The prefix-to-sheet configuration failed to parse. Raised before the
    /// document is touched.
    #[error("invalid source configuration: {0}")]
    BadConfig(String),

    /// Every configured source failed to load, so the mapping would be empty.
    #[error("no data could be retrieved from any configured source")]
    NoData,

    /// The uploaded document could not be parsed or re-serialized. No partial
    /// output is produced in this case.
    #[error("invalid document: {0}")]
    BadDocument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

/// A failure scoped to a single data source.
///
/// These are always recovered locally by skipping the source and warning the
/// caller; they never abort a mapping build on their own.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The named sheet or table does not exist in the source.
    #[error("source \"{0}\" not found")]
    NotFound(String),

    /// The source exists but its contents could not be read. Timed-out or
    /// otherwise unreachable remote sources report this variant too and are
    /// treated exactly like a missing source.
    #[error("source \"{0}\" could not be read: {1}")]
    Unreadable(String, String),
}
