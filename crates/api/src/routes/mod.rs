pub mod books;
pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod reviews;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path segment into a typed id.
pub(crate) fn parse_id<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what}: {e}")))
}
