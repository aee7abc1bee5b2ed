pub mod decisions;
pub mod groups;
