pub mod journal_service;

pub use journal_service::JournalService;
