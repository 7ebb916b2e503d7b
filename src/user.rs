//! Code for creating the user table and fetching users from the mirror.

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::UserId};

/// A user of the aggregation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The user's upstream ID.
    pub id_user: UserId,
    /// The display name the user was registered with.
    pub name: String,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id_user TEXT PRIMARY KEY,
                name TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Insert upstream users, skipping any whose ID is already in the mirror.
///
/// Returns the users that were actually inserted.
///
/// # Errors
///
/// Returns an [Error::UpstreamUnavailable] if an SQL related error occurred.
pub fn import_users(users: Vec<User>, connection: &Connection) -> Result<Vec<User>, Error> {
    let mut stmt = connection.prepare(
        "INSERT INTO user (id_user, name) VALUES (?1, ?2) ON CONFLICT(id_user) DO NOTHING",
    )?;

    let mut imported = Vec::new();
    for user in users {
        if stmt.execute((&user.id_user, &user.name))? == 1 {
            imported.push(user);
        }
    }

    Ok(imported)
}

/// Get the user from the mirror with an ID equal to `id_user`.
///
/// Returns `None` if `id_user` does not belong to a known user.
///
/// # Errors
///
/// Returns an [Error::UpstreamUnavailable] if there was an error trying to access the store.
pub fn get_user_by_id(id_user: &str, connection: &Connection) -> Result<Option<User>, Error> {
    connection
        .prepare("SELECT id_user, name FROM user WHERE id_user = :id_user")?
        .query_row(&[(":id_user", &id_user)], |row| {
            Ok(User {
                id_user: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .optional()
        .map_err(|error| error.into())
}
