// Repository modules
pub mod household_repository;
pub mod user_repository;
pub mod session_repository;
pub mod chore_repository;
pub mod reward_repository;
pub mod event_repository;
pub mod transaction_repository;
pub mod learning_repository;

// Re-export repository types
pub use household_repository::HouseholdRepository;
pub use user_repository::{Credentials, UserRepository};
pub use session_repository::{Session, SessionRepository};
pub use chore_repository::ChoreRepository;
pub use reward_repository::RewardRepository;
pub use event_repository::EventRepository;
pub use transaction_repository::{EntryOutcome, LedgerClaim, NewEntry, TransactionRepository};
pub use learning_repository::{IssuedPuzzle, LearningRepository};
