//! Tenant isolation logic that does not touch the database.
//!
//! - [`resolver`] turns an authenticated request credential into a
//!   [`TenantContext`], or refuses to.
//! - [`policy`] is the registry of tenant-scoped tables and renders the
//!   row-level security SQL applied to each of them.

mod error;
pub mod policy;
pub mod resolver;

pub use error::TenantError;
pub use policy::{POLICY_NAME, TENANT_SETTING, TENANT_TABLES, TablePolicy};
pub use resolver::{TenantContext, TokenVerifier, resolve_bearer, resolve_token};
