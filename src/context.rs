//! The identity a query runs as.

use rusqlite::Connection;

use crate::{
    Error,
    database_id::UserId,
    session::{Session, get_session_user},
    user::get_user_by_id,
};

/// Who a query is made for.
///
/// Callers either hold a session or act directly on a user ID (the API key
/// flow), never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryContext {
    /// Act as the user the session was issued for.
    Session(Session),
    /// Act directly as the user with this ID.
    User(UserId),
}

impl From<Session> for QueryContext {
    fn from(session: Session) -> Self {
        QueryContext::Session(session)
    }
}

impl QueryContext {
    /// Resolve the context to the ID of a known user.
    ///
    /// # Errors
    ///
    /// Returns [Error::UpstreamUnavailable] if the session token was never
    /// issued, if the user does not exist, or if the store cannot be read.
    pub fn resolve(&self, connection: &Connection) -> Result<UserId, Error> {
        match self {
            QueryContext::Session(session) => get_session_user(&session.token, connection)?
                .ok_or_else(|| {
                    Error::UpstreamUnavailable(format!(
                        "session {:?} is not valid",
                        session
                    ))
                }),
            QueryContext::User(id_user) => get_user_by_id(id_user, connection)?
                .map(|user| user.id_user)
                .ok_or_else(|| Error::UpstreamUnavailable(format!("unknown user {id_user}"))),
        }
    }
}
