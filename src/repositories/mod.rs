//! Repository layer for database operations.
//!
//! Repository structs encapsulate queries against the SeaORM entities so the
//! sync engine works with plain models and partial `ActiveModel` updates.

pub mod account;
pub mod task;

pub use account::AccountRepository;
pub use task::TaskRepository;
