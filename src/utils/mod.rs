//! Utility modules for taskmirror.
//!
//! - [`datetime`] - Provider timestamp parsing and formatting helpers

pub mod datetime;
