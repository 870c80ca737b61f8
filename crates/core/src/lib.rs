//! Core tenancy and auth logic for Nestling.
//!
//! This crate contains pure logic with ZERO web or database dependencies.
//!
//! # Modules
//!
//! - `auth` - Roles and password hashing
//! - `tenancy` - Tenant context resolution and the row-level security policy registry

pub mod auth;
pub mod tenancy;
