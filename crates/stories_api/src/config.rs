//! Explicit startup configuration for the transport adapter.

use serde::Deserialize;
use std::path::PathBuf;

/// How a denied mutation is presented to the caller.
///
/// Denied reads are always concealed as not-found inside the core; this
/// policy only affects update/transition/archive/deactivate denials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialPolicy {
    /// Report 404, hiding the resource's existence from non-owners.
    Conceal,
    /// Report 403, acknowledging the resource exists.
    Reveal,
}

/// Adapter configuration, passed explicitly at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// SQLite database file backing all requests.
    pub db_path: PathBuf,
    /// Presentation policy for denied mutations.
    pub denial_policy: DenialPolicy,
}

impl ApiConfig {
    /// Creates a configuration with the concealing denial policy.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            denial_policy: DenialPolicy::Conceal,
        }
    }

    /// Overrides the denial presentation policy.
    pub fn with_denial_policy(mut self, policy: DenialPolicy) -> Self {
        self.denial_policy = policy;
        self
    }
}
