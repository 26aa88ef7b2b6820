//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `serrano_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("serrano_core ping={}", serrano_core::ping());
    println!("serrano_core version={}", serrano_core::core_version());
}
