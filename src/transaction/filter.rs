//! Strongly typed filters for transaction queries.

use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    database_id::{AccountId, CredentialId, SiteId, SiteOrganizationId, TransactionId},
};

/// What to fetch from the transaction mirror.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionQuery {
    /// Exactly the transaction with this ID, if the user owns it.
    ///
    /// No other filter applies, so this yields zero or one transaction.
    ById(TransactionId),
    /// Every transaction matching all of the filter's criteria.
    Filtered(TransactionFilter),
}

impl From<TransactionFilter> for TransactionQuery {
    fn from(filter: TransactionFilter) -> Self {
        TransactionQuery::Filtered(filter)
    }
}

/// A time window that is open at the start and closed at the end: `from < dt <= to`.
///
/// Windows built this way tile without gaps or overlaps, i.e. `(a, b]` and
/// `(b, c]` together cover exactly `(a, c]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    from: Option<OffsetDateTime>,
    to: Option<OffsetDateTime>,
}

impl TimeWindow {
    /// A window with no bounds on either side.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Transactions strictly after `from` and no later than `to`.
    ///
    /// # Errors
    /// Returns [Error::InvalidFilter] if `from` is later than `to`.
    pub fn between(from: OffsetDateTime, to: OffsetDateTime) -> Result<Self, Error> {
        if from > to {
            return Err(Error::invalid_filter(format!(
                "window start {from} is after window end {to}"
            )));
        }

        Ok(Self {
            from: Some(from),
            to: Some(to),
        })
    }

    /// Transactions strictly after `from`.
    pub fn after(from: OffsetDateTime) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    /// Transactions no later than `to`.
    pub fn until(to: OffsetDateTime) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }

    /// The exclusive lower bound.
    pub fn from(&self) -> Option<OffsetDateTime> {
        self.from
    }

    /// The inclusive upper bound.
    pub fn to(&self) -> Option<OffsetDateTime> {
        self.to
    }

    /// Whether the window is bounded on both sides.
    pub fn is_bounded(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }

    /// Whether `dt` falls inside the window.
    pub fn contains(&self, dt: OffsetDateTime) -> bool {
        self.from.is_none_or(|from| dt > from) && self.to.is_none_or(|to| dt <= to)
    }

    /// Split the window into consecutive sub-windows of length `step`.
    ///
    /// The last sub-window is cut short at the end of the window. Together the
    /// sub-windows cover the window exactly once.
    ///
    /// # Errors
    /// Returns [Error::InvalidFilter] if the window is not bounded on both
    /// sides or `step` is not positive.
    pub fn split_every(&self, step: Duration) -> Result<Vec<TimeWindow>, Error> {
        let (Some(from), Some(to)) = (self.from, self.to) else {
            return Err(Error::invalid_filter(
                "only windows bounded on both sides can be split",
            ));
        };

        if !step.is_positive() {
            return Err(Error::invalid_filter(format!(
                "window step must be positive, got {step}"
            )));
        }

        let mut windows = Vec::new();
        let mut start = from;
        while start < to {
            let end = start.checked_add(step).map_or(to, |end| end.min(to));
            windows.push(TimeWindow {
                from: Some(start),
                to: Some(end),
            });
            start = end;
        }

        Ok(windows)
    }
}

/// Keyword criteria over a transaction's searchable text.
///
/// Matching is a case-insensitive (ASCII) substring search over the
/// description and the reference. Including and excluding the same keyword
/// splits any result set into two disjoint parts that together make up the
/// whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordFilter {
    /// Keep transactions that match at least one keyword.
    Include(Vec<String>),
    /// Keep transactions that match none of the keywords.
    Exclude(Vec<String>),
}

impl KeywordFilter {
    /// Keep transactions that contain `keyword`.
    pub fn include(keyword: impl Into<String>) -> Self {
        KeywordFilter::Include(vec![keyword.into()])
    }

    /// Keep transactions that do not contain `keyword`.
    pub fn exclude(keyword: impl Into<String>) -> Self {
        KeywordFilter::Exclude(vec![keyword.into()])
    }

    /// The keywords, regardless of mode.
    pub fn keywords(&self) -> &[String] {
        match self {
            KeywordFilter::Include(keywords) | KeywordFilter::Exclude(keywords) => keywords,
        }
    }

    /// Check that there is at least one keyword and no keyword is blank.
    ///
    /// # Errors
    /// Returns [Error::InvalidFilter] describing the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        let keywords = self.keywords();

        if keywords.is_empty() {
            return Err(Error::invalid_filter("keyword list is empty"));
        }

        if keywords.iter().any(|keyword| keyword.trim().is_empty()) {
            return Err(Error::invalid_filter("keywords cannot be blank"));
        }

        Ok(())
    }
}

/// A page of results: skip the first `skip` matches and return at most `limit`.
///
/// The default is the whole result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    skip: u64,
    limit: Option<u64>,
}

impl Pagination {
    /// A page of `limit` results starting at offset `skip`.
    ///
    /// # Errors
    /// Returns [Error::InvalidFilter] if `skip` is negative or `limit` is not positive.
    pub fn new(skip: i64, limit: i64) -> Result<Self, Error> {
        Self::from_parts(Some(skip), Some(limit))
    }

    /// Build a page from optional parts, as they arrive from request options.
    ///
    /// # Errors
    /// Returns [Error::InvalidFilter] if `skip` is negative or `limit` is not positive.
    pub fn from_parts(skip: Option<i64>, limit: Option<i64>) -> Result<Self, Error> {
        let skip = match skip {
            Some(skip) => u64::try_from(skip)
                .map_err(|_| Error::invalid_filter(format!("skip must not be negative, got {skip}")))?,
            None => 0,
        };

        let limit = match limit {
            Some(limit) if limit > 0 => Some(limit.unsigned_abs()),
            Some(limit) => {
                return Err(Error::invalid_filter(format!(
                    "limit must be greater than zero, got {limit}"
                )));
            }
            None => None,
        };

        Ok(Self { skip, limit })
    }

    /// How many matches are skipped.
    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// The page size, `None` for no limit.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// The page directly after this one, if the page has a limit.
    pub fn next_page(&self) -> Option<Self> {
        self.limit.map(|limit| Self {
            skip: self.skip + limit,
            limit: Some(limit),
        })
    }
}

/// The order to sort transactions by date.
///
/// Ties on the date are always broken by ascending transaction ID, so the
/// order is total and repeated queries page through results identically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    #[default]
    Descending,
}

/// Criteria for a [TransactionQuery::Filtered] query.
///
/// All criteria that are set must hold for a transaction to match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// When the transactions happened.
    pub window: TimeWindow,
    /// Only transactions on this account.
    pub id_account: Option<AccountId>,
    /// Only transactions sourced through this credential.
    pub id_credential: Option<CredentialId>,
    /// Only transactions from this site.
    pub id_site: Option<SiteId>,
    /// Only transactions from sites of this organization.
    pub id_site_organization: Option<SiteOrganizationId>,
    /// Keyword inclusion or exclusion.
    pub keywords: Option<KeywordFilter>,
    /// Which slice of the matches to return. Ignored when counting.
    pub pagination: Pagination,
    /// The order matches are returned in.
    pub sort_order: SortOrder,
}

impl TransactionFilter {
    /// Set the time window.
    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    /// Only keep transactions on `id_account`.
    pub fn account(mut self, id_account: impl Into<AccountId>) -> Self {
        self.id_account = Some(id_account.into());
        self
    }

    /// Only keep transactions sourced through `id_credential`.
    pub fn credential(mut self, id_credential: impl Into<CredentialId>) -> Self {
        self.id_credential = Some(id_credential.into());
        self
    }

    /// Only keep transactions from `id_site`.
    pub fn site(mut self, id_site: impl Into<SiteId>) -> Self {
        self.id_site = Some(id_site.into());
        self
    }

    /// Only keep transactions from sites run by `id_site_organization`.
    pub fn site_organization(mut self, id_site_organization: impl Into<SiteOrganizationId>) -> Self {
        self.id_site_organization = Some(id_site_organization.into());
        self
    }

    /// Set the keyword criteria.
    pub fn keywords(mut self, keywords: KeywordFilter) -> Self {
        self.keywords = Some(keywords);
        self
    }

    /// Set the page to return.
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Set the sort order.
    pub fn sort(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }
}
