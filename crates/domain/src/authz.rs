//! Access rules as a pure predicate over (identity, operation, resource).
//!
//! Callers evaluate [`authorize`] before dispatching an operation; nothing in
//! here touches storage.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Role carried by a verified identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" | "user" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}

/// A verified caller, as supplied by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Operations subject to access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ReadCatalog,
    ManageCatalog,
    ManageCart,
    PlaceOrder,
    ListOrders,
    CancelOrder,
    SubmitReview,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::ReadCatalog => "read catalog",
            Operation::ManageCatalog => "manage catalog",
            Operation::ManageCart => "manage cart",
            Operation::PlaceOrder => "place order",
            Operation::ListOrders => "list orders",
            Operation::CancelOrder => "cancel order",
            Operation::SubmitReview => "submit review",
        };
        write!(f, "{name}")
    }
}

/// What the operation acts upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// The caller's own cart, orders or reviews.
    Own,
    /// A specific order and its owner.
    Order { owner: UserId },
    /// The shared catalog.
    Catalog,
}

/// Returns true if `identity` may perform `operation` on `resource`.
pub fn is_permitted(identity: &Identity, operation: Operation, resource: Resource) -> bool {
    match (operation, resource) {
        (Operation::ReadCatalog, _) => true,
        (Operation::ManageCatalog, Resource::Catalog) => identity.is_admin(),
        (
            Operation::ManageCart
            | Operation::PlaceOrder
            | Operation::ListOrders
            | Operation::SubmitReview,
            Resource::Own,
        ) => true,
        (Operation::CancelOrder, Resource::Order { owner }) => {
            owner == identity.user_id || identity.is_admin()
        }
        _ => false,
    }
}

/// Like [`is_permitted`], but as a `Result` for use with `?`.
pub fn authorize(
    identity: &Identity,
    operation: Operation,
    resource: Resource,
) -> Result<(), DomainError> {
    if is_permitted(identity, operation, resource) {
        Ok(())
    } else {
        Err(DomainError::AccessDenied { operation })
    }
}
