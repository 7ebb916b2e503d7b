//! Defines the crate level error type.

/// The errors that may occur when querying the transaction mirror.
///
/// A query that matches nothing is not an error, callers get a zero count or
/// an empty list instead.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The caller built a query that cannot be run.
    ///
    /// This covers malformed pagination (a zero or negative limit, a negative
    /// skip), inverted time windows, empty keywords, setting both `keywords`
    /// and `skip_keywords`, and bulk queries without any bounds.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The backing data source could not serve the request.
    ///
    /// This is returned for SQL failures, a store that has not been
    /// initialized, a poisoned connection lock and contexts that do not
    /// resolve to a known user. The string should only be logged, it is not
    /// meant for end users.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The query engine configuration could not be parsed.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Shortcut for creating an [Error::InvalidFilter] from anything printable.
    pub(crate) fn invalid_filter(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!("rejected filter: {reason}");
        Error::InvalidFilter(reason)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred: {}", value);
        Error::UpstreamUnavailable(value.to_string())
    }
}
