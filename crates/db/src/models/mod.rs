//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` struct matching the database row and,
//! where rows are inserted from outside the crate, a create DTO.

pub mod collection;
pub mod decision;
pub mod group;
pub mod selection_record;
