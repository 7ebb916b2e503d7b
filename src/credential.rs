//! Credentials link a user to an institution in the site catalogue.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::{CredentialId, SiteId, UserId},
};

/// A linked institution authorization used to source transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The credential's upstream ID.
    pub id_credential: CredentialId,
    /// The user that linked the credential.
    pub id_user: UserId,
    /// The site the credential logs in to.
    pub id_site: SiteId,
    /// The login name shown to the user. Never the secret itself.
    pub username: String,
}

/// Create the credential table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_credential_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS credential (
                id_credential TEXT PRIMARY KEY,
                id_user TEXT NOT NULL,
                id_site TEXT NOT NULL,
                username TEXT NOT NULL,
                FOREIGN KEY(id_user) REFERENCES user(id_user) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(id_site) REFERENCES site(id_site) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Insert upstream credentials, skipping IDs already in the mirror.
///
/// # Errors
///
/// Returns an [Error::UpstreamUnavailable] if an SQL related error occurred.
pub fn import_credentials(
    credentials: Vec<Credential>,
    connection: &Connection,
) -> Result<Vec<Credential>, Error> {
    let mut stmt = connection.prepare(
        "INSERT INTO credential (id_credential, id_user, id_site, username)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id_credential) DO NOTHING",
    )?;

    let mut imported = Vec::new();
    for credential in credentials {
        let inserted = stmt.execute((
            &credential.id_credential,
            &credential.id_user,
            &credential.id_site,
            &credential.username,
        ))?;

        if inserted == 1 {
            imported.push(credential);
        }
    }

    Ok(imported)
}

/// Get the credentials linked by `id_user`, ordered by ID.
///
/// # Errors
///
/// Returns an [Error::UpstreamUnavailable] if the credentials cannot be read.
pub fn get_credentials(id_user: &str, connection: &Connection) -> Result<Vec<Credential>, Error> {
    connection
        .prepare(
            "SELECT id_credential, id_user, id_site, username FROM credential
             WHERE id_user = :id_user ORDER BY id_credential ASC",
        )?
        .query_map(&[(":id_user", &id_user)], |row| {
            Ok(Credential {
                id_credential: row.get(0)?,
                id_user: row.get(1)?,
                id_site: row.get(2)?,
                username: row.get(3)?,
            })
        })?
        .map(|maybe_credential| maybe_credential.map_err(Error::from))
        .collect()
}
