use crate::error::{RdaoError, Result};

/// Longest name SQL Server accepts for a regular identifier.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Checks that `name` is a regular SQL Server identifier: a letter, `_` or
/// `#` followed by letters, digits, `_`, `@`, `$` or `#`.
pub fn validate_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '#');
    let valid_rest = chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '@' | '$' | '#'));

    if valid_start && valid_rest && name.chars().count() <= MAX_IDENTIFIER_LEN {
        Ok(name)
    } else {
        Err(RdaoError::InvalidIdentifier(name.to_string()))
    }
}
