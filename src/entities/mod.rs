pub mod account;
pub mod task;

pub use account::Entity as Account;
pub use task::Entity as Task;
pub use task::{Mirror, TaskPriority, TaskStatus};
