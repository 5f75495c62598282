//! # Utilities
//!
//! Text helpers shared by the formatter:
//! - [`span_locator`]: whitespace-tolerant, case-insensitive phrase location in a submission.
//! - [`text_cleanup`]: trimming of backticks, ellipses and quotes around bullet text.

pub mod span_locator;
pub mod text_cleanup;
