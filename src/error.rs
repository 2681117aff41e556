use std::fmt;

/// Failures that can occur while resolving pages or syncing appearance.
///
/// None of these reach a visitor as an error page: fetch failures become a
/// 404 view, parse failures fall back to raw markup and persistence failures
/// are logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteError {
    NotFound,
    FetchFailure(String),
    ParseFailure(String),
    PersistenceFailure(String),
    Validation(String),
}

impl fmt::Display for SiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteError::NotFound => write!(f, "not found"),
            SiteError::FetchFailure(msg) => write!(f, "fetch failed: {}", msg),
            SiteError::ParseFailure(msg) => write!(f, "parse failed: {}", msg),
            SiteError::PersistenceFailure(msg) => write!(f, "persistence failed: {}", msg),
            SiteError::Validation(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SiteError {}
