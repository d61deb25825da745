//! Domain model for authored content.
//!
//! # Responsibility
//! - Define the canonical Author and Story records used by business logic.
//! - Own field-level validation and the story visibility state machine.
//!
//! # Invariants
//! - Every domain object is identified by a stable, non-nil UUID.
//! - Removal is represented by soft states (inactive author, archived
//!   story), never by hard deletes.

pub mod author;
pub mod story;
