//! Paybook-rs is a client library for a financial data aggregation service.
//!
//! Upstream transactions, accounts, credentials and the site catalogues are
//! mirrored into SQLite. The [Client] counts and pages through the mirrored
//! transactions with filters that compose consistently: splitting a query by
//! time window, by account, credential, site or site organization, or by
//! including and excluding a keyword always adds back up to the unsplit total.
//!
//! ```no_run
//! use paybook_rs::{Client, QueryConfig, QueryContext, TransactionFilter, TimeWindow};
//! use time::macros::datetime;
//!
//! # fn main() -> Result<(), paybook_rs::Error> {
//! let client = Client::open("mirror.db", QueryConfig::default())?;
//! let session = client.create_session("5a1f0c2b784806ab3e8b4567")?;
//! let january = TimeWindow::between(
//!     datetime!(2017-01-01 00:00 UTC),
//!     datetime!(2017-02-01 00:00 UTC),
//! )?;
//!
//! let count = client.count_transactions(
//!     &QueryContext::Session(session),
//!     &TransactionFilter::default().window(january).into(),
//! )?;
//! println!("{count} transactions in January");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod account;
mod catalogue;
mod client;
mod config;
mod context;
mod credential;
mod database_id;
mod db;
mod error;
mod logging;
mod session;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use account::Account;
pub use catalogue::{Site, SiteOrganization};
pub use client::Client;
pub use config::QueryConfig;
pub use context::QueryContext;
pub use credential::Credential;
pub use database_id::{AccountId, CredentialId, SiteId, SiteOrganizationId, TransactionId, UserId};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use logging::redact_token;
pub use session::Session;
pub use transaction::{
    KeywordFilter, Pagination, SortOrder, TimeWindow, Transaction, TransactionFilter,
    TransactionOptions, TransactionQuery,
};
pub use user::User;
