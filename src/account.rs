//! Accounts hold the balances that transactions move money in and out of.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::{AccountId, CredentialId, SiteId, UserId},
};

/// A bank account, credit card or similar sourced through a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The account's upstream ID.
    pub id_account: AccountId,
    /// The user that owns the account.
    pub id_user: UserId,
    /// The credential the account was sourced through.
    pub id_credential: CredentialId,
    /// The site the account belongs to.
    pub id_site: SiteId,
    /// The name of the account as shown by the institution.
    pub name: String,
    /// The balance at the last sync.
    pub balance: f64,
    /// ISO 4217 currency code, e.g. "MXN".
    pub currency: String,
}

/// Create the account table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id_account TEXT PRIMARY KEY,
            id_user TEXT NOT NULL,
            id_credential TEXT NOT NULL,
            id_site TEXT NOT NULL,
            name TEXT NOT NULL,
            balance REAL NOT NULL,
            currency TEXT NOT NULL,
            FOREIGN KEY(id_user) REFERENCES user(id_user) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(id_credential) REFERENCES credential(id_credential) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Insert upstream accounts, skipping IDs already in the mirror.
///
/// # Errors
///
/// Returns an [Error::UpstreamUnavailable] if an SQL related error occurred.
pub fn import_accounts(accounts: Vec<Account>, connection: &Connection) -> Result<Vec<Account>, Error> {
    let mut stmt = connection.prepare(
        "INSERT INTO account (id_account, id_user, id_credential, id_site, name, balance, currency)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id_account) DO NOTHING",
    )?;

    let mut imported = Vec::new();
    for account in accounts {
        let inserted = stmt.execute((
            &account.id_account,
            &account.id_user,
            &account.id_credential,
            &account.id_site,
            &account.name,
            account.balance,
            &account.currency,
        ))?;

        if inserted == 1 {
            imported.push(account);
        }
    }

    Ok(imported)
}

/// Get the accounts owned by `id_user`, ordered by ID.
///
/// # Errors
///
/// Returns an [Error::UpstreamUnavailable] if the accounts cannot be read.
pub fn get_accounts(id_user: &str, connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id_account, id_user, id_credential, id_site, name, balance, currency
             FROM account WHERE id_user = :id_user ORDER BY id_account ASC",
        )?
        .query_map(&[(":id_user", &id_user)], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id_account: row.get(0)?,
        id_user: row.get(1)?,
        id_credential: row.get(2)?,
        id_site: row.get(3)?,
        name: row.get(4)?,
        balance: row.get(5)?,
        currency: row.get(6)?,
    })
}
