//! Request options as named by the upstream API, and their conversion to a typed query.

use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{AccountId, CredentialId, SiteId, SiteOrganizationId, TransactionId},
};

use super::filter::{KeywordFilter, Pagination, TimeWindow, TransactionFilter, TransactionQuery};

/// The raw options accepted by the transactions endpoint.
///
/// Timestamps are unix seconds. `keywords` and `skip_keywords` each carry a
/// single keyword, taken verbatim, so a keyword may contain commas. Unknown
/// option names are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionOptions {
    /// Exclusive lower bound of the time window.
    pub dt_transaction_from: Option<i64>,
    /// Inclusive upper bound of the time window.
    pub dt_transaction_to: Option<i64>,
    /// Exact match on the transaction ID. Overrides every other option.
    pub id_transaction: Option<TransactionId>,
    /// Filter by account.
    pub id_account: Option<AccountId>,
    /// Filter by credential.
    pub id_credential: Option<CredentialId>,
    /// Filter by site.
    pub id_site: Option<SiteId>,
    /// Filter by site organization.
    pub id_site_organization: Option<SiteOrganizationId>,
    /// Keep transactions matching this keyword.
    pub keywords: Option<String>,
    /// Keep transactions not matching this keyword.
    pub skip_keywords: Option<String>,
    /// Number of matches to skip.
    pub skip: Option<i64>,
    /// Maximum number of matches to return.
    pub limit: Option<i64>,
}

impl TransactionOptions {
    /// Parse options from a JSON object.
    ///
    /// # Errors
    /// Returns [Error::InvalidFilter] if the JSON is malformed, has a value of
    /// the wrong type, or uses an unknown option name.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json)
            .map_err(|error| Error::invalid_filter(format!("could not parse options: {error}")))
    }
}

impl TryFrom<TransactionOptions> for TransactionQuery {
    type Error = Error;

    fn try_from(options: TransactionOptions) -> Result<Self, Self::Error> {
        // Validate everything first so that an ID lookup cannot hide a malformed request.
        let window = parse_window(options.dt_transaction_from, options.dt_transaction_to)?;
        let pagination = Pagination::from_parts(options.skip, options.limit)?;
        let keywords = parse_keywords(options.keywords, options.skip_keywords)?;

        if let Some(id_transaction) = options.id_transaction {
            return Ok(TransactionQuery::ById(id_transaction));
        }

        Ok(TransactionQuery::Filtered(TransactionFilter {
            window,
            id_account: options.id_account,
            id_credential: options.id_credential,
            id_site: options.id_site,
            id_site_organization: options.id_site_organization,
            keywords,
            pagination,
            ..Default::default()
        }))
    }
}

fn parse_timestamp(name: &str, timestamp: i64) -> Result<OffsetDateTime, Error> {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|error| Error::invalid_filter(format!("{name} {timestamp} is out of range: {error}")))
}

fn parse_window(from: Option<i64>, to: Option<i64>) -> Result<TimeWindow, Error> {
    let from = from
        .map(|from| parse_timestamp("dt_transaction_from", from))
        .transpose()?;
    let to = to
        .map(|to| parse_timestamp("dt_transaction_to", to))
        .transpose()?;

    match (from, to) {
        (Some(from), Some(to)) => TimeWindow::between(from, to),
        (Some(from), None) => Ok(TimeWindow::after(from)),
        (None, Some(to)) => Ok(TimeWindow::until(to)),
        (None, None) => Ok(TimeWindow::unbounded()),
    }
}

fn parse_keywords(
    keywords: Option<String>,
    skip_keywords: Option<String>,
) -> Result<Option<KeywordFilter>, Error> {
    let filter = match (keywords, skip_keywords) {
        (Some(_), Some(_)) => {
            return Err(Error::invalid_filter(
                "keywords and skip_keywords cannot be used together",
            ));
        }
        (Some(keywords), None) => KeywordFilter::Include(vec![keywords]),
        (None, Some(skip_keywords)) => KeywordFilter::Exclude(vec![skip_keywords]),
        (None, None) => return Ok(None),
    };

    filter.validate()?;

    Ok(Some(filter))
}
