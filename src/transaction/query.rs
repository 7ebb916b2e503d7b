//! Builds and runs the SQL for counting and fetching transactions.

use rusqlite::{Connection, params_from_iter, types::Value};

use crate::{Error, config::QueryConfig};

use super::{
    core::{TRANSACTION_COLUMNS, Transaction, map_transaction_row},
    filter::{KeywordFilter, SortOrder, TransactionFilter, TransactionQuery},
};

/// Collects `WHERE` conditions and their numbered parameters.
#[derive(Default)]
struct WhereClause {
    conditions: Vec<String>,
    parameters: Vec<Value>,
}

impl WhereClause {
    /// Add a parameter and return its placeholder, e.g. `?3`.
    fn bind(&mut self, value: Value) -> String {
        self.parameters.push(value);
        format!("?{}", self.parameters.len())
    }

    fn push_equals(&mut self, column: &str, value: &str) {
        let placeholder = self.bind(Value::Text(value.to_owned()));
        self.conditions.push(format!("{column} = {placeholder}"));
    }

    fn push_keywords(&mut self, keywords: &KeywordFilter) {
        let matches = keywords
            .keywords()
            .iter()
            .map(|keyword| {
                // SQLite's lower() only folds ASCII, so fold the keyword the same way.
                let placeholder = self.bind(Value::Text(keyword.to_ascii_lowercase()));
                format!(
                    "instr(lower(description), {placeholder}) > 0 \
                     OR instr(lower(reference), {placeholder}) > 0"
                )
            })
            .collect::<Vec<_>>()
            .join(" OR ");

        match keywords {
            KeywordFilter::Include(_) => self.conditions.push(format!("({matches})")),
            KeywordFilter::Exclude(_) => self.conditions.push(format!("NOT ({matches})")),
        }
    }

    fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

fn build_where_clause(id_user: &str, query: &TransactionQuery) -> WhereClause {
    let mut clause = WhereClause::default();
    clause.push_equals("id_user", id_user);

    let filter = match query {
        TransactionQuery::ById(id_transaction) => {
            clause.push_equals("id_transaction", id_transaction);
            return clause;
        }
        TransactionQuery::Filtered(filter) => filter,
    };

    if let Some(from) = filter.window.from() {
        let placeholder = clause.bind(Value::Integer(from.unix_timestamp()));
        clause.conditions.push(format!("dt_transaction > {placeholder}"));
    }

    if let Some(to) = filter.window.to() {
        let placeholder = clause.bind(Value::Integer(to.unix_timestamp()));
        clause.conditions.push(format!("dt_transaction <= {placeholder}"));
    }

    let identity_filters = [
        ("id_account", &filter.id_account),
        ("id_credential", &filter.id_credential),
        ("id_site", &filter.id_site),
        ("id_site_organization", &filter.id_site_organization),
    ];

    for (column, value) in identity_filters {
        if let Some(value) = value {
            clause.push_equals(column, value);
        }
    }

    if let Some(keywords) = &filter.keywords {
        clause.push_keywords(keywords);
    }

    clause
}

fn validate_filter(filter: &TransactionFilter) -> Result<(), Error> {
    match &filter.keywords {
        Some(keywords) => keywords.validate(),
        None => Ok(()),
    }
}

fn validate_page(filter: &TransactionFilter, config: &QueryConfig) -> Result<(), Error> {
    match filter.pagination.limit() {
        Some(limit) if limit > config.max_page_size => {
            return Err(Error::invalid_filter(format!(
                "limit {limit} is larger than the maximum page size {}",
                config.max_page_size
            )));
        }
        _ => {}
    }

    if config.require_temporal_bounds
        && !filter.window.is_bounded()
        && filter.pagination.limit().is_none()
    {
        return Err(Error::invalid_filter(
            "bulk queries need a time window bounded on both sides or a limit",
        ));
    }

    Ok(())
}

/// Count the transactions of `id_user` that match `query`.
///
/// Pagination is not a filter and is ignored.
///
/// # Errors
/// Returns [Error::InvalidFilter] if the keyword criteria are malformed, or
/// [Error::UpstreamUnavailable] if the mirror cannot be queried.
pub(crate) fn count_transactions(
    id_user: &str,
    query: &TransactionQuery,
    connection: &Connection,
) -> Result<u64, Error> {
    if let TransactionQuery::Filtered(filter) = query {
        validate_filter(filter)?;
    }

    let clause = build_where_clause(id_user, query);
    let sql = format!(
        "SELECT COUNT(id_transaction) FROM \"transaction\" {}",
        clause.to_sql()
    );

    let count: i64 = connection
        .prepare(&sql)?
        .query_row(params_from_iter(clause.parameters.iter()), |row| row.get(0))?;

    tracing::debug!("counted {count} transactions for user {id_user} matching {query:?}");

    checked_count(count)
}

fn checked_count(count: i64) -> Result<u64, Error> {
    u64::try_from(count).map_err(|_| {
        tracing::error!("store returned a negative count {count}");
        Error::UpstreamUnavailable(format!("store returned a negative count {count}"))
    })
}

/// Get the transactions of `id_user` that match `query`.
///
/// Filtered queries are sorted by date in the filter's order, then by
/// ascending ID, and the page is cut from that order.
///
/// # Errors
/// Returns [Error::InvalidFilter] if the filter is malformed, asks for a page
/// larger than `config` allows, or is an unbounded bulk query that `config`
/// forbids. Returns [Error::UpstreamUnavailable] if the mirror cannot be queried.
pub(crate) fn get_transactions(
    id_user: &str,
    query: &TransactionQuery,
    config: &QueryConfig,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let clause = build_where_clause(id_user, query);
    let mut query_string_parts = vec![
        format!("SELECT {TRANSACTION_COLUMNS} FROM \"transaction\""),
        clause.to_sql(),
    ];

    if let TransactionQuery::Filtered(filter) = query {
        validate_filter(filter)?;
        validate_page(filter, config)?;

        query_string_parts.push(
            match filter.sort_order {
                SortOrder::Ascending => "ORDER BY dt_transaction ASC, id_transaction ASC",
                SortOrder::Descending => "ORDER BY dt_transaction DESC, id_transaction ASC",
            }
            .to_owned(),
        );

        let pagination = filter.pagination;
        match pagination.limit() {
            Some(limit) => {
                query_string_parts.push(format!("LIMIT {limit} OFFSET {}", pagination.skip()))
            }
            // A negative limit means no limit in SQLite.
            None if pagination.skip() > 0 => {
                query_string_parts.push(format!("LIMIT -1 OFFSET {}", pagination.skip()))
            }
            None => {}
        }
    }

    let query_string = query_string_parts.join(" ");

    let transactions = connection
        .prepare(&query_string)?
        .query_map(params_from_iter(clause.parameters.iter()), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        "fetched {} transactions for user {id_user} matching {query:?}",
        transactions.len()
    );

    Ok(transactions)
}
