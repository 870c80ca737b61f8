//! Repository abstractions for data access.
//!
//! Every repository except the subdomain lookup borrows a [`TenantScope`],
//! so its queries can only run inside a transaction bound to one tenant.
//!
//! [`TenantScope`]: crate::rls::TenantScope

pub mod audit_log;
pub mod child;
pub mod magic_link;
pub mod tenant;
pub mod user;

pub use audit_log::{AuditEntry, AuditLogRepository};
pub use child::{ChildRepository, NewChild};
pub use magic_link::MagicLinkRepository;
pub use tenant::TenantRepository;
pub use user::{NewUser, UserRepository};
