//! # Storage Module
//!
//! Handles all data persistence for the home economy server.
//!
//! Every household record lives in a single SQLite database accessed through
//! SQLx. Repositories are thin, clonable handles over the shared pool; they
//! scope every lookup by household so a record of another household is
//! indistinguishable from a missing one.
//!
//! ## Key Responsibilities
//!
//! - **Connection Management**: Opening the pool and creating the schema at startup
//! - **Data Access**: One repository per record type (users, chores, rewards, ...)
//! - **Ledger Safety**: Balance changes and their ledger entries commit atomically
//!
//! ## Design Principles
//!
//! - **Repository Pattern**: Clean separation between domain and data access
//! - **Testability**: Private in-memory databases for unit tests

pub mod connection;
pub mod repositories;

#[cfg(test)]
pub mod test_utils;

// Re-export the main types that other modules need
pub use connection::DbConnection;
pub use repositories::{
    ChoreRepository,
    Credentials,
    EntryOutcome,
    EventRepository,
    HouseholdRepository,
    IssuedPuzzle,
    LearningRepository,
    LedgerClaim,
    NewEntry,
    RewardRepository,
    Session,
    SessionRepository,
    TransactionRepository,
    UserRepository,
};
