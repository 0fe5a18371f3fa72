pub mod handlers;

pub use history::{SyncHistory, SyncKind, SyncOutcome, SyncRunRecord};
pub use scheduler::{SyncError, SyncScheduler};

mod history;
mod scheduler;
