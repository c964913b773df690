//! Caller identity taken from trusted upstream headers.
//!
//! The authentication layer in front of this service verifies credentials
//! and forwards the result as `x-user-id` and `x-user-role`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use domain::{Identity, Role};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
    parts
        .headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| ApiError::Unauthenticated(format!("malformed {name} header")))
        })
        .transpose()
}

/// Extracts the verified caller. A missing role means customer.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER)?
            .ok_or_else(|| ApiError::Unauthenticated(format!("missing {USER_ID_HEADER} header")))?
            .parse::<UserId>()
            .map_err(|e| ApiError::Unauthenticated(format!("invalid {USER_ID_HEADER}: {e}")))?;

        let role = match header_value(parts, USER_ROLE_HEADER)? {
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|e| ApiError::Unauthenticated(e.to_string()))?,
            None => Role::default(),
        };

        Ok(Caller(Identity { user_id, role }))
    }
}
