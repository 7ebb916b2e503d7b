//! Transactions and the query engine over them.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` record and its table in the mirror
//! - The typed filters and the raw upstream request options
//! - The SQL that counts and pages through matching transactions

mod core;
mod filter;
mod options;
mod query;

pub use self::core::{Transaction, create_transaction_table, import_transactions};
pub use filter::{
    KeywordFilter, Pagination, SortOrder, TimeWindow, TransactionFilter, TransactionQuery,
};
pub use options::TransactionOptions;

pub(crate) use query::{count_transactions, get_transactions};
