//! Defines the transaction record and its table in the mirror.

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{AccountId, CredentialId, SiteId, SiteOrganizationId, TransactionId, UserId},
};

/// An expense or income sourced from an aggregated institution.
///
/// Transactions are immutable once synced, the query engine only ever reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The upstream ID of the transaction.
    pub id_transaction: TransactionId,
    /// The user the transaction belongs to.
    pub id_user: UserId,
    /// The account the money moved in or out of.
    pub id_account: AccountId,
    /// The credential the transaction was sourced through.
    pub id_credential: CredentialId,
    /// The site the credential belongs to.
    pub id_site: SiteId,
    /// The organization behind the site.
    pub id_site_organization: SiteOrganizationId,
    /// When the transaction happened, with second precision.
    #[serde(with = "time::serde::timestamp")]
    pub dt_transaction: OffsetDateTime,
    /// The description given by the institution.
    pub description: String,
    /// Extra reference text, e.g. invoice metadata. Empty if the institution
    /// gives none.
    pub reference: String,
    /// The amount of money spent (negative) or earned (positive).
    pub amount: f64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// The columns selected for a [Transaction], in the order [map_transaction_row] expects.
pub(crate) const TRANSACTION_COLUMNS: &str = "id_transaction, id_user, id_account, id_credential, \
    id_site, id_site_organization, dt_transaction, description, reference, amount, currency";

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id_transaction TEXT PRIMARY KEY,
                id_user TEXT NOT NULL,
                id_account TEXT NOT NULL,
                id_credential TEXT NOT NULL,
                id_site TEXT NOT NULL,
                id_site_organization TEXT NOT NULL,
                dt_transaction INTEGER NOT NULL,
                description TEXT NOT NULL,
                reference TEXT NOT NULL DEFAULT '',
                amount REAL NOT NULL,
                currency TEXT NOT NULL,
                FOREIGN KEY(id_user) REFERENCES user(id_user) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(id_account) REFERENCES account(id_account) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(id_credential) REFERENCES credential(id_credential) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(id_site) REFERENCES site(id_site) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(id_site_organization) REFERENCES site_organization(id_site_organization)
                    ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Every bulk query is scoped to a user and usually to a time window.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date
            ON \"transaction\"(id_user, dt_transaction, id_transaction);",
        (),
    )?;

    Ok(())
}

/// Insert upstream transactions into the mirror.
///
/// Transactions whose ID already exists are left untouched, so syncing the
/// same upstream page twice is safe. Returns the transactions that were
/// actually inserted.
///
/// # Errors
/// Returns an [Error::UpstreamUnavailable] if there is an SQL error, including
/// a transaction that refers to an unknown user, account, credential or site.
pub fn import_transactions(
    transactions: Vec<Transaction>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let tx = connection.unchecked_transaction()?;
    let mut imported_transactions = Vec::new();

    {
        let mut stmt = tx.prepare(
            "INSERT INTO \"transaction\" (id_transaction, id_user, id_account, id_credential,
                id_site, id_site_organization, dt_transaction, description, reference, amount, currency)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id_transaction) DO NOTHING",
        )?;

        for transaction in transactions {
            let inserted = stmt.execute((
                &transaction.id_transaction,
                &transaction.id_user,
                &transaction.id_account,
                &transaction.id_credential,
                &transaction.id_site,
                &transaction.id_site_organization,
                transaction.dt_transaction.unix_timestamp(),
                &transaction.description,
                &transaction.reference,
                transaction.amount,
                &transaction.currency,
            ))?;

            if inserted == 1 {
                imported_transactions.push(transaction);
            }
        }
    }

    tx.commit()?;

    tracing::debug!("imported {} transactions", imported_transactions.len());

    Ok(imported_transactions)
}

/// Map a row selected with [TRANSACTION_COLUMNS] to a [Transaction].
///
/// # Errors
/// Returns an error if a column is missing, has the wrong type, or if the
/// stored timestamp is out of range.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let timestamp: i64 = row.get(6)?;
    let dt_transaction = OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(6, Type::Integer, Box::new(error)))?;

    Ok(Transaction {
        id_transaction: row.get(0)?,
        id_user: row.get(1)?,
        id_account: row.get(2)?,
        id_credential: row.get(3)?,
        id_site: row.get(4)?,
        id_site_organization: row.get(5)?,
        dt_transaction,
        description: row.get(7)?,
        reference: row.get(8)?,
        amount: row.get(9)?,
        currency: row.get(10)?,
    })
}
