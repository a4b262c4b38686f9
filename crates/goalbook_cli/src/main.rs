//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `goalbook_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("goalbook_core ping={}", goalbook_core::ping());
    println!("goalbook_core version={}", goalbook_core::core_version());
}
