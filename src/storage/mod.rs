//! Local storage module for the task and account tables
//!
//! This module owns the database connection and schema creation. Queries live
//! in [`crate::repositories`].

pub mod db;

pub use db::LocalStorage;
