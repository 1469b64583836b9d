use thiserror::Error;

// ---------------------------------------------------------------------------
// Boundary errors
// ---------------------------------------------------------------------------

/// Failure to obtain a dataset. This is the only session-fatal error: without
/// a dataset there is nothing to filter or chart.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {source_name} failed: {reason}")]
    Network { source_name: String, reason: String },

    #[error("{source_name} answered with HTTP {status}")]
    Status { source_name: String, status: u16 },

    #[error("reading {source_name}: {reason}")]
    Io { source_name: String, reason: String },

    #[error("parsing {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
}

/// Failure to serialize the filtered rows for download. Recoverable: the UI
/// shows a notice instead of the download action.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("writing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("flushing CSV buffer: {0}")]
    Buffer(String),

    #[error("saving {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
