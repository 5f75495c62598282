//! # Parsers
//!
//! Parsing of raw model replies, from whole-reply JSON repair down to single bullets.
//!
//! The parsers implemented in this module adhere to the [`crate::traits::parser::Parser`] trait.
//!
//! The available parsers are:
//! - [`output_parser`]: Repairs a category reply and extracts its bullet strings.
//! - [`literal_parser`]: Permissive JSON/Python literal parser used as a repair fallback.
//! - [`bullet_parser`]: Strips list markers and citations from a single bullet.

pub mod bullet_parser;
pub mod literal_parser;
pub mod output_parser;
