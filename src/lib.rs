//! Back-Office API Library
//!
//! This crate provides the core functionality for a small-retail back
//! office: the account directory with role-based capabilities, the product
//! catalog with its restock audit trail, per-user shopping carts, checkout
//! into the immutable order ledger, attendance tracking with payroll
//! hours, and sales reporting.
//!
//! The HTTP layer, token issuance and migrations live outside this crate;
//! the public surface is [`AppServices`] over a sea-orm connection pool.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod services;

pub use errors::ServiceError;
pub use services::AppServices;

pub mod prelude {
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::services::attendance::*;
    pub use crate::services::cart::*;
    pub use crate::services::catalog::*;
    pub use crate::services::checkout::*;
    pub use crate::services::reports::*;
    pub use crate::services::users::*;
    pub use crate::services::AppServices;
}
