//! Authentication and role-based access control.
//!
//! This module provides:
//! - Staff password hashing with Argon2id
//! - Role definitions shared by staff and parent accounts

mod password;

pub use password::{MIN_PASSWORD_LEN, PasswordError, hash_password, verify_password};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account roles within a nursery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Owns the nursery account; full access.
    Owner,
    /// Full access except ownership transfer.
    Admin,
    /// Runs day-to-day operations: rooms, staff rotas, billing.
    Manager,
    /// Practitioner: attendance, daily logs, messaging.
    Staff,
    /// Guardian with portal access to their own children.
    Parent,
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl UserRole {
    /// All roles, in descending order of privilege.
    pub const ALL: [Self; 5] = [
        Self::Owner,
        Self::Admin,
        Self::Manager,
        Self::Staff,
        Self::Parent,
    ];

    /// Returns the wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Staff => "staff",
            Self::Parent => "parent",
        }
    }

    /// Returns true for any nursery employee.
    #[must_use]
    pub const fn is_staff_member(&self) -> bool {
        !matches!(self, Self::Parent)
    }

    /// Returns true if this role can hire, edit, or deactivate staff.
    #[must_use]
    pub const fn can_manage_staff(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::Manager)
    }

    /// Returns true if this role can see invoices and payments for all families.
    #[must_use]
    pub const fn can_view_billing(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::Manager)
    }

    /// Returns true if this role can modify nursery settings and branding.
    #[must_use]
    pub const fn can_modify_settings(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
