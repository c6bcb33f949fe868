//! Souk Core - Shared types and session state.
//!
//! This crate provides the types used across all Souk components:
//! - `api` - REST backend for the catalog, checkout and owner dashboard
//! - `cli` - Command-line tools for migrations and account management
//! - browser clients, which hold a [`cart::Cart`] and an
//!   [`session::OwnerSession`] for the lifetime of a page
//!
//! # Architecture
//!
//! The core crate contains only types, state machines and pure functions -
//! no I/O, no database access, no HTTP clients. Anything time-dependent takes
//! the current time as an argument so behaviour is deterministic under test.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, usernames, products, orders, contacts
//! - [`cart`] - Customer cart held in page memory
//! - [`catalog`] - Catalog search
//! - [`dashboard`] - Owner dashboard aggregates
//! - [`lockout`] - Failed-login and request-rate lockout primitives
//! - [`session`] - Owner authentication session state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod lockout;
pub mod session;
pub mod types;

pub use types::*;
