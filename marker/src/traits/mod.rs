//!
//! Traits Module
//!
//! This module contains core traits used throughout the feedback pipeline for extensibility and abstraction.
//!
//! - [`parser`]: Defines the generic trait for parsing model output into Rust types.
//! - [`provider`]: Defines the chat-provider seam that model adapters implement.

pub mod parser;
pub mod provider;
