//! Error taxonomy shared by every stage of the scoring pipeline

/// Errors raised while building records, scoring them, or reading and writing tables.
///
/// `Validation`, `Format` and `Schema` are structural: they stop the operation before any
/// partial output is produced. `Network`, `Service` and `InvalidResponse` are per-record
/// failures that a batch run records as an absent result and moves past.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("malformed table: {0}")]
    Format(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("prediction service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    #[error("unexpected response from prediction service: {0}")]
    InvalidResponse(String),

    #[error("missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("unsupported file format: {0} (expected .xlsx or .csv)")]
    UnsupportedFormat(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("failed to start scoring workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Frame(#[from] polars::prelude::PolarsError),

    #[error("failed to read spreadsheet: {0}")]
    SpreadsheetRead(#[from] calamine::Error),

    #[error("failed to write spreadsheet: {0}")]
    SpreadsheetWrite(#[from] rust_xlsxwriter::XlsxError),
}

impl Error {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// True for failures that only affect the record being scored.
    pub fn is_record_failure(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Service { .. } | Error::InvalidResponse(_)
        )
    }

    /// Failures worth another attempt: connection problems and 5xx responses.
    pub(crate) fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Service { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_failure_classification() {
        assert!(Error::Network("timed out".into()).is_record_failure());
        assert!(Error::Service {
            status: 422,
            body: "bad".into()
        }
        .is_record_failure());
        assert!(!Error::Format("missing".into()).is_record_failure());
        assert!(!Error::Schema { missing: vec![] }.is_record_failure());
    }

    #[test]
    fn test_only_network_and_server_errors_are_transient() {
        assert!(Error::Network("refused".into()).is_transient());
        assert!(Error::Service {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!Error::Service {
            status: 404,
            body: String::new()
        }
        .is_transient());
        assert!(!Error::InvalidResponse("garbage".into()).is_transient());
    }

    #[test]
    fn test_schema_message_lists_columns() {
        let err = Error::Schema {
            missing: vec!["Prediction".into(), "Probability".into()],
        };
        assert_eq!(
            err.to_string(),
            "missing required column(s): Prediction, Probability"
        );
    }
}
