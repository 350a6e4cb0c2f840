pub mod journal;

use serde::Serialize;

pub use journal::{Journal, JournalData, JournalInput, JournalPatch, JournalStatus, NewJournal};

/// Result body of count and bulk update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Count {
    pub count: u64,
}
