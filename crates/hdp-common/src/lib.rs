//! HDP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the HDP project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all HDP workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Centralized tracing setup
//! - **Types**: Shared domain types (logical tables, pipeline results)
//!
//! # Example
//!
//! ```no_run
//! use hdp_common::{Result, Table};
//!
//! fn resolve(name: &str) -> Result<Table> {
//!     let table: Table = name.parse()?;
//!     Ok(table)
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{HdpError, Result};
pub use types::{PipelineResult, Table};
