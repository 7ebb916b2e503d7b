//! Sets up the SQLite mirror of the upstream records.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, account::create_account_table, catalogue::create_catalogue_tables,
    credential::create_credential_table, session::create_session_table,
    transaction::create_transaction_table, user::create_user_table,
};

/// Create the tables for every record type in the mirror.
///
/// Tables are created in dependency order inside a single exclusive
/// transaction, so either all tables exist afterwards or none were added.
/// Calling this on an already initialized database is a no-op.
///
/// # Errors
/// Returns an [Error::UpstreamUnavailable] if the schema could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Must be set outside of a transaction to take effect.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_session_table(&transaction)?;
    create_catalogue_tables(&transaction)?;
    create_credential_table(&transaction)?;
    create_account_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    tracing::debug!("initialized transaction mirror schema");

    Ok(())
}
