//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or an open transaction for steps that must share a
//! row lock) as the first argument.

pub mod collection_repo;
pub mod decision_repo;
pub mod group_repo;
pub mod selection_record_repo;

pub use collection_repo::CollectionRepo;
pub use decision_repo::DecisionRepo;
pub use group_repo::GroupRepo;
pub use selection_record_repo::SelectionRecordRepo;
