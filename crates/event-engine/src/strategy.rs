//! Strategy plug-in contract
//!
//! A strategy consumes the full market event stream on its group's thread,
//! may hold at most one not-yet-drained order intent, and receives execution
//! outcomes back through `on_order_response`. All three calls happen on the
//! group thread; implementations need `Send` but never `Sync`.

use crate::events::{MarketEvent, OrderRequest, OrderResponse};
use serde::{Deserialize, Serialize};

pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Consume one market event. Return true when an order is now pending.
    fn on_market_event(&mut self, event: &MarketEvent) -> bool;

    /// Hand the pending order to the engine, returning to the idle state.
    fn take_pending_order(&mut self) -> Option<OrderRequest>;

    /// Execution outcome for an order this strategy emitted, including the
    /// `Dropped` backpressure signal when the order queue was full.
    fn on_order_response(&mut self, response: &OrderResponse);
}

/// Fan-out consumer groups; each group drains the stream on its own thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StrategyGroup {
    A = 0,
    B = 1,
}

impl StrategyGroup {
    pub const COUNT: usize = 2;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Per-strategy lifecycle as seen by the group thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StrategyState {
    Idle = 0,
    Evaluating = 1,
    OrderPending = 2,
}

impl Default for StrategyState {
    fn default() -> Self {
        StrategyState::Idle
    }
}
