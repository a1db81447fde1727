//! Mapping between local and external task status.
//!
//! The provider only knows "open" and "completed", so `in-progress` has no
//! external counterpart: it pushes as open, and a newer open external task
//! pulls back as `pending`.

use crate::entities::TaskStatus;
use crate::provider::ExternalStatus;

/// External status → local status.
pub fn to_local(status: ExternalStatus) -> TaskStatus {
    match status {
        ExternalStatus::Completed => TaskStatus::Completed,
        ExternalStatus::NeedsAction => TaskStatus::Pending,
    }
}

/// Local status → external status.
pub fn to_external(status: TaskStatus) -> ExternalStatus {
    match status {
        TaskStatus::Completed => ExternalStatus::Completed,
        TaskStatus::Pending | TaskStatus::InProgress => ExternalStatus::NeedsAction,
    }
}
