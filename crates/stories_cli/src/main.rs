//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `stories_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("stories_core ping={}", stories_core::ping());
    println!("stories_core version={}", stories_core::core_version());
}
