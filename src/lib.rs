//! # Tachyon: Low-Latency Multi-Exchange Trading Core
//!
//! A real-account crypto trading framework core built in Rust featuring:
//! - Lock-free single-producer ring buffer with fan-out consumers
//! - Bounded SPSC/MPSC order queues
//! - Multi-threaded strategy groups with optional CPU pinning
//! - Nanosecond end-to-end latency measurement

pub mod config;
pub mod latency;
pub mod utils;

pub use event_engine;

pub type Result<T> = anyhow::Result<T>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.trim().is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "tachyon");
    }
}
