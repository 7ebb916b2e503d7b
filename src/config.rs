//! Configuration for the transaction query engine.

use serde::Deserialize;

use crate::Error;

/// Controls how much data a single query may return.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// The largest `limit` a caller may request for one page.
    pub max_page_size: u64,
    /// Reject `get` calls that have neither a time bound nor a limit.
    ///
    /// Counting is always allowed without bounds.
    pub require_temporal_bounds: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_page_size: 500,
            require_temporal_bounds: true,
        }
    }
}

impl QueryConfig {
    /// Parse a config from a JSON object. Missing fields take their default value.
    ///
    /// # Errors
    /// Returns [Error::InvalidConfig] if `json` is not a valid config object.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|error| {
            tracing::error!("could not parse query config: {error}");
            Error::InvalidConfig(error.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::QueryConfig;

    #[test]
    fn missing_fields_use_defaults() {
        let got = QueryConfig::from_json(r#"{"max_page_size": 25}"#).unwrap();

        assert_eq!(
            got,
            QueryConfig {
                max_page_size: 25,
                require_temporal_bounds: true,
            }
        );
    }

    #[test]
    fn empty_object_is_default() {
        let got = QueryConfig::from_json("{}").unwrap();

        assert_eq!(got, QueryConfig::default());
    }

    #[test]
    fn rejects_malformed_json() {
        let got = QueryConfig::from_json(r#"{"max_page_size": "lots"}"#);

        assert!(
            matches!(got, Err(Error::InvalidConfig(_))),
            "want InvalidConfig, got {got:?}"
        );
    }
}
