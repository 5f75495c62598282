//! Parser Trait
//!
//! This module defines the [`Parser`] trait, which provides a generic interface for parsing
//! loosely structured model output into strongly-typed Rust structures. Implementations of
//! this trait are responsible for validating the input and converting it into the appropriate
//! domain model, returning detailed errors on failure.
//!
//! # Example
//!
//! ```rust
//! use marker::error::MarkerError;
//! use marker::traits::parser::Parser;
//!
//! struct LineParser;
//!
//! impl<'a> Parser<&'a str, Vec<String>> for LineParser {
//!     fn parse(&self, raw: &'a str) -> Result<Vec<String>, MarkerError> {
//!         if raw.is_empty() {
//!             return Err(MarkerError::EmptyOutput);
//!         }
//!         Ok(raw.lines().map(str::to_string).collect())
//!     }
//! }
//! ```

use crate::error::MarkerError;

/// A generic trait for parsing data into a strongly-typed Rust structure.
///
/// # Type Parameters
///
/// * `Input` - The input type to be parsed.
/// * `Output` - The output type produced by the parser.
pub trait Parser<Input, Output> {
    /// Parse an input value into the target type.
    ///
    /// # Errors
    ///
    /// Returns a [`MarkerError`] if the input cannot be parsed.
    fn parse(&self, input: Input) -> Result<Output, MarkerError>;
}
