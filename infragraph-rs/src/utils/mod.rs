//! Shared utilities.
//!
//! Includes:
//! - Column header normalization
//! - Security-group list parsing

pub mod text;

pub use text::{normalize_column_name, parse_security_groups};
