//! Sessions tie an opaque token to the user it was issued for.

use std::fmt::{self, Write};

use rand::{RngCore, rngs::OsRng};
use rusqlite::{Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::{Error, database_id::UserId, logging::redact_token, user::get_user_by_id};

/// An issued session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// The opaque session token.
    pub token: String,
    /// The user the session was issued for.
    pub id_user: UserId,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &redact_token(&self.token))
            .field("id_user", &self.id_user)
            .finish()
    }
}

/// Create the session table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS session (
                token TEXT PRIMARY KEY,
                id_user TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY(id_user) REFERENCES user(id_user) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Issue a new session for the user `id_user`.
///
/// # Errors
///
/// Returns an [Error::UpstreamUnavailable] if `id_user` is not a known user or
/// if the session could not be stored.
pub fn create_session(id_user: &str, connection: &Connection) -> Result<Session, Error> {
    if get_user_by_id(id_user, connection)?.is_none() {
        return Err(Error::UpstreamUnavailable(format!(
            "cannot open a session for unknown user {id_user}"
        )));
    }

    let now = OffsetDateTime::now_utc();
    let token = generate_token();

    connection.execute(
        "INSERT INTO session (token, id_user, created_at) VALUES (?1, ?2, ?3)",
        (&token, id_user, now.unix_timestamp()),
    )?;

    tracing::debug!("opened session {} for user {id_user}", redact_token(&token));

    Ok(Session {
        token,
        id_user: id_user.to_owned(),
    })
}

/// Find the user a session `token` was issued for.
///
/// Returns `None` if the token was never issued.
///
/// # Errors
///
/// Returns an [Error::UpstreamUnavailable] if the session table cannot be read.
pub fn get_session_user(token: &str, connection: &Connection) -> Result<Option<UserId>, Error> {
    connection
        .prepare("SELECT id_user FROM session WHERE token = :token")?
        .query_row(&[(":token", &token)], |row| row.get(0))
        .optional()
        .map_err(|error| error.into())
}

/// Number of random bytes in a session token.
const TOKEN_BYTES: usize = 32;

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);

    bytes
        .iter()
        .fold(String::with_capacity(TOKEN_BYTES * 2), |mut token, byte| {
            let _ = write!(token, "{byte:02x}");
            token
        })
}
