//! Import pipeline for ostinato.
//!
//! Reads the five flat source files (artists, tags, user–artist play
//! counts, tag applications, friendship pairs), validates and repairs
//! rows, and loads them into the relational store in dependency order
//! with batched commits. The final [`ImportReport`] is the single
//! source of truth for what was imported versus skipped.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod import;
pub mod parse;
pub mod report;

pub use config::Config;
pub use error::{ImportError, ImportResult};
pub use import::Importer;
pub use report::{ImportReport, StageCounts};
