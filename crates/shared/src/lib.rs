//! Shared types, errors, and configuration for Nestling.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs, most importantly [`TenantId`]
//! - JWT claims and the token service
//! - Application-wide error types
//! - Configuration management
//! - Transactional email delivery (magic links)

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod jwt;
pub mod types;


pub use auth::{Claims, TokenKind, TokenPair};
pub use config::{AppConfig, EmailConfig, MagicLinkConfig};
pub use email::{EmailError, EmailService};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use types::TenantId;
