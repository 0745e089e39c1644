//! Core domain model for ostinato.
//!
//! This crate defines the normalized relational model for a Last.fm
//! style listening-history dataset (artists, derived users, tags,
//! weighted listens, dated tag applications, a directed friendship
//! relation), the SQLite schema that stores it, and the read-only
//! query/aggregation layer over the populated store.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod query;
pub mod schema;

pub use error::{Error, Result};
