//! Shared runtime plumbing for the feedback service: environment-backed
//! configuration and upload storage paths.

pub mod config;
pub mod paths;
pub mod test_helpers;
