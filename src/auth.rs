//! Respondent identity.

use std::collections::BTreeMap;

use thiserror::Error;

/// Identity used when logins are disabled; never treated as completed.
pub const PLACEHOLDER_RESPONDENT_ID: &str = "testaccount";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("User or password incorrect")]
    InvalidCredentials,
}

pub fn is_placeholder(respondent_id: &str) -> bool {
    respondent_id == PLACEHOLDER_RESPONDENT_ID
}

/// Checks a username/password pair and returns the respondent id on success.
///
/// Unknown users and wrong passwords produce the same error.
pub fn authenticate(
    credentials: &BTreeMap<String, String>,
    username: &str,
    password: &str,
) -> Result<String, AuthError> {
    let username = username.trim();
    let Some(expected) = credentials.get(username) else {
        return Err(AuthError::InvalidCredentials);
    };

    if constant_time_eq(password.as_bytes(), expected.as_bytes()) {
        Ok(username.to_string())
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    let mut diff = left.len() ^ right.len();
    for index in 0..left.len().max(right.len()) {
        let a = left.get(index).copied().unwrap_or(0);
        let b = right.get(index).copied().unwrap_or(0);
        diff |= usize::from(a ^ b);
    }
    diff == 0
}
