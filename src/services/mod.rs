// src/services/mod.rs
//
// External collaborators: account storage and the Google identity provider

pub mod accounts;
pub mod google;

// Re-export commonly used types for convenience
pub use accounts::{AccountStore, SqliteAccountStore};
pub use google::GoogleService;
