//! Transport adapter for the stories core.
//!
//! # Responsibility
//! - Expose the core's use-cases through a narrow, transport-agnostic
//!   request/response envelope.
//! - Map internal error kinds to HTTP-style status codes.
//!
//! # Invariants
//! - This crate alone formats user-visible messages; core errors pass
//!   through it unformatted.
//! - Handling a request never panics and never carries state to the next
//!   request.

mod api;
mod config;

pub use api::{Api, ApiRequest, ApiResponse};
pub use config::{ApiConfig, DenialPolicy};
