//! taskmirror - bidirectional task synchronization with Google Tasks
//!
//! This library keeps a local task store and each connected account's
//! Google Tasks lists in agreement. It imports externally changed tasks,
//! reconciles status and due dates in both directions, and runs both as
//! recurring jobs with an on-demand trigger per account.
//!
//! # Modules
//!
//! * [`config`] - Application configuration management
//! * [`provider`] - External task provider abstraction and the Google Tasks client
//! * [`sync`] - Import, reconciliation, and the credential gate
//! * [`scheduler`] - Recurring job runners
//! * [`storage`] / [`repositories`] - Local database access

/// Configuration module for managing application settings
pub mod config;

/// Application constants and default values
pub mod constants;

/// SeaORM entity models for database tables
pub mod entities;

/// Logging setup
pub mod logger;

/// External task provider abstraction
pub mod provider;

/// Repository layer for database operations
pub mod repositories;

/// Recurring job driver
pub mod scheduler;

/// Local database connection and schema
pub mod storage;

/// Synchronization engine between local tasks and the provider
pub mod sync;

/// Utility functions for date/time handling
pub mod utils;

pub use entities::{account, task};
