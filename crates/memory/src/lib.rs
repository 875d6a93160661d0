//! Memory for Dayloop: a small literal-match store that holds the user's
//! preferences and notes for the current run.

pub mod store;

pub use store::{DEFAULT_RETRIEVE_LIMIT, MemoryStore, keywords};
