//! `SeaORM` entities for the tables the application reads and writes.
//!
//! Every table except `tenants` carries a `tenant_id` column and is covered
//! by the `tenant_isolation` policy.

pub mod audit_logs;
pub mod children;
pub mod invoices;
pub mod magic_link_tokens;
pub mod rooms;
pub mod tenants;
pub mod users;

pub mod prelude {
    //! Re-exports of all entities.
    pub use super::audit_logs::Entity as AuditLogs;
    pub use super::children::Entity as Children;
    pub use super::invoices::Entity as Invoices;
    pub use super::magic_link_tokens::Entity as MagicLinkTokens;
    pub use super::rooms::Entity as Rooms;
    pub use super::tenants::Entity as Tenants;
    pub use super::users::Entity as Users;
}
