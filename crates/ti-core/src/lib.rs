//! # ti-core
//!
//! Core types for tidyinfer.
//!
//! This crate provides:
//! - [`Table`], [`Column`] and [`Factor`]: column-oriented input data
//! - [`Error`] and [`Result`]: the error taxonomy shared by every pipeline stage

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;
/// Tabular data types.
pub mod types;

pub use error::{Error, Result};
pub use types::{Column, ColumnKind, Factor, NamedColumn, Table};
