//! # event-engine: lock-free market event fan-out
//!
//! The low-latency core of the trading system:
//! - Single-producer ring buffer with independent fan-out consumers
//! - Bounded SPSC/MPSC queues for order intents
//! - Cache-line-sized, trivially copyable event records
//! - Thread orchestration with optional per-role CPU pinning

pub mod affinity;
pub mod engine;
pub mod error;
pub mod events;
pub mod executor;
pub mod queues;
pub mod ring_buffer;
pub mod strategy;
pub mod types;

pub use engine::{Engine, EngineConfig, ThreadConfig, WaitStrategy};
pub use error::EngineError;
pub use events::{
    timestamp_ns, MarketEvent, MarketEventKind, OrderKind, OrderRequest, OrderResponse, OrderStatus,
};
pub use executor::{AckExecutor, OrderExecutor};
pub use queues::{MpscQueue, SpscQueue};
pub use ring_buffer::{RingBuffer, RingConsumer};
pub use strategy::{Strategy, StrategyGroup, StrategyState};
pub use types::{OrderId, Price, Quantity, Side, SymbolId};
