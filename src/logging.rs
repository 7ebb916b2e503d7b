//! Helpers for keeping secrets out of the logs.

/// How many leading characters of a session token are kept when logging.
pub const TOKEN_VISIBLE_PREFIX: usize = 6;

/// Redact a session token so it can be logged.
///
/// The first [TOKEN_VISIBLE_PREFIX] characters are kept so that log lines for
/// the same session can still be correlated.
pub fn redact_token(token: &str) -> String {
    match token.char_indices().nth(TOKEN_VISIBLE_PREFIX) {
        Some((end, _)) => format!("{}********", &token[..end]),
        None => "********".to_owned(),
    }
}
