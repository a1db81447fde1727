//! Constants used throughout the application
//!
//! This module centralizes provider endpoints, default values and fallback
//! strings so they stay consistent across the sync engine.

// Google endpoints
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_TASKS_API: &str = "https://tasks.googleapis.com/tasks/v1";
pub const GOOGLE_TASKS_SCOPE: &str = "https://www.googleapis.com/auth/tasks";

/// Task list used when an account exposes no lists at all.
pub const DEFAULT_TASK_LIST_ID: &str = "@default";

/// Page size requested from the provider for list endpoints.
pub const PROVIDER_PAGE_SIZE: u32 = 100;

// Scheduler defaults
pub const DEFAULT_STATUS_SYNC_INTERVAL_MINUTES: u64 = 5;
pub const DEFAULT_IMPORT_INTERVAL_MINUTES: u64 = 1;
pub const MAX_INTERVAL_MINUTES: u64 = 1440;

/// Lookback window for an account's first import pull.
pub const DEFAULT_INITIAL_LOOKBACK_DAYS: i64 = 30;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Environment variables holding OAuth client secrets
pub const DEFAULT_CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
pub const DEFAULT_CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";

// Fallbacks for externally created items with missing fields
pub const UNTITLED_TASK: &str = "Untitled";

// Config file locations
pub const CONFIG_FILE_NAME: &str = "taskmirror.toml";
pub const APP_DIR_NAME: &str = "taskmirror";
pub const CONFIG_GENERATED: &str = "✅ Configuration file generated";
