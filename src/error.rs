use thiserror::Error;

/// Metadata for a package could not be retrieved or understood: transport
/// failure, HTTP status >= 400, unparseable JSON, or a payload missing a
/// required field. Recoverable while enumerating candidate sources, fatal
/// during eager GitHub target resolution and cache priming.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct MetadataFetchError(pub String);

impl MetadataFetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn http(url: &str, status: u16) -> Self {
        Self(format!("Failed to fetch {url}: HTTP {status}"))
    }

    pub fn invalid_json(url: &str) -> Self {
        Self(format!("Invalid JSON from {url}"))
    }
}

/// A resolution attempt failed for one package: no candidates, constraints
/// unsatisfiable under the current assignments, or a dependency cycle that
/// cannot be closed. Recoverable inside the backtracking search; at the top
/// level it is frozen into a `Conflict` record.
#[derive(Debug, Clone, Error)]
#[error("{package}: {message}")]
pub struct ResolutionError {
    pub package: String,
    pub required_by: Vec<String>,
    pub message: String,
    pub candidates: Option<Vec<String>>,
}

impl ResolutionError {
    pub fn new(package: impl Into<String>, required_by: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            required_by,
            message: message.into(),
            candidates: None,
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidates = Some(candidates);
        self
    }
}
