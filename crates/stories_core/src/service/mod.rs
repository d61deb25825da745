//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Apply authorization and lifecycle rules before any mutation.
//! - Keep transport layers decoupled from storage details.

pub mod author_service;
pub mod story_service;
