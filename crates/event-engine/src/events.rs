//! Fixed-layout event records moved through the ring buffer and queues
//!
//! Every record is trivially copyable, cache-line aligned and free of heap
//! indirection, so a slot write is a handful of plain stores and adjacent
//! slots touched by different threads never share a cache line. Each record
//! carries the nanosecond timestamp of its creation; subtracting it at the
//! consumer gives end-to-end latency.

use crate::types::{OrderId, Price, Quantity, Side, SymbolId};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock nanoseconds since the Unix epoch
#[inline]
pub fn timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_nanos() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MarketEventKind {
    Tick = 0,
    Trade = 1,
    Kline = 2,
    Depth = 3,
}

impl Default for MarketEventKind {
    fn default() -> Self {
        MarketEventKind::Tick
    }
}

/// One normalized market update, immutable once published
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[repr(C, align(64))]
pub struct MarketEvent {
    pub kind: MarketEventKind,
    pub symbol: SymbolId,
    pub timestamp_ns: u64,
    pub price: Price,
    pub quantity: Quantity,
    pub bid: Price,
    pub ask: Price,
}

impl MarketEvent {
    #[inline]
    pub fn tick(symbol: SymbolId, price: Price, quantity: Quantity) -> Self {
        Self {
            kind: MarketEventKind::Tick,
            symbol,
            timestamp_ns: timestamp_ns(),
            price,
            quantity,
            bid: Price::ZERO,
            ask: Price::ZERO,
        }
    }

    #[inline]
    pub fn trade(symbol: SymbolId, price: Price, quantity: Quantity) -> Self {
        Self {
            kind: MarketEventKind::Trade,
            symbol,
            timestamp_ns: timestamp_ns(),
            price,
            quantity,
            bid: Price::ZERO,
            ask: Price::ZERO,
        }
    }

    #[inline]
    pub fn kline(symbol: SymbolId, close: Price, volume: Quantity) -> Self {
        Self {
            kind: MarketEventKind::Kline,
            symbol,
            timestamp_ns: timestamp_ns(),
            price: close,
            quantity: volume,
            bid: Price::ZERO,
            ask: Price::ZERO,
        }
    }

    #[inline]
    pub fn depth(symbol: SymbolId, bid: Price, ask: Price) -> Self {
        Self {
            kind: MarketEventKind::Depth,
            symbol,
            timestamp_ns: timestamp_ns(),
            price: Price::ZERO,
            quantity: Quantity::ZERO,
            bid,
            ask,
        }
    }

    /// Nanoseconds between creation and now
    #[inline]
    pub fn age_ns(&self) -> u64 {
        timestamp_ns().saturating_sub(self.timestamp_ns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderKind {
    Limit = 0,
    Market = 1,
}

impl Default for OrderKind {
    fn default() -> Self {
        OrderKind::Limit
    }
}

/// Order intent emitted by a strategy, handed off by value into the order queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[repr(C, align(64))]
pub struct OrderRequest {
    pub order_id: OrderId,
    pub symbol: SymbolId,
    /// Routing key assigned by the engine: group in the high half, slot in the low half
    pub strategy_id: u32,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Price,
    pub quantity: Quantity,
    pub timestamp_ns: u64,
}

impl OrderRequest {
    #[inline]
    pub fn new(symbol: SymbolId, side: Side, kind: OrderKind, price: Price, quantity: Quantity) -> Self {
        Self {
            order_id: OrderId::new(),
            symbol,
            strategy_id: 0,
            side,
            kind,
            price,
            quantity,
            timestamp_ns: timestamp_ns(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    Accepted = 0,
    Filled = 1,
    PartiallyFilled = 2,
    Rejected = 3,
    /// The order never reached the execution consumer (order queue full)
    Dropped = 4,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Accepted
    }
}

/// Execution outcome, routed back to the originating strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[repr(C, align(64))]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub strategy_id: u32,
    pub status: OrderStatus,
    pub fill_price: Price,
    pub fill_quantity: Quantity,
    pub timestamp_ns: u64,
}

impl OrderResponse {
    #[inline]
    pub fn accepted(request: &OrderRequest) -> Self {
        Self {
            order_id: request.order_id,
            strategy_id: request.strategy_id,
            status: OrderStatus::Accepted,
            fill_price: Price::ZERO,
            fill_quantity: Quantity::ZERO,
            timestamp_ns: timestamp_ns(),
        }
    }

    #[inline]
    pub fn filled(request: &OrderRequest, fill_price: Price, fill_quantity: Quantity) -> Self {
        Self {
            order_id: request.order_id,
            strategy_id: request.strategy_id,
            status: OrderStatus::Filled,
            fill_price,
            fill_quantity,
            timestamp_ns: timestamp_ns(),
        }
    }

    #[inline]
    pub fn rejected(request: &OrderRequest) -> Self {
        Self {
            order_id: request.order_id,
            strategy_id: request.strategy_id,
            status: OrderStatus::Rejected,
            fill_price: Price::ZERO,
            fill_quantity: Quantity::ZERO,
            timestamp_ns: timestamp_ns(),
        }
    }

    #[inline]
    pub fn dropped(request: &OrderRequest) -> Self {
        Self {
            order_id: request.order_id,
            strategy_id: request.strategy_id,
            status: OrderStatus::Dropped,
            fill_price: Price::ZERO,
            fill_quantity: Quantity::ZERO,
            timestamp_ns: timestamp_ns(),
        }
    }
}

// One cache line each; adjacent slots must never false-share.
const _: () = assert!(std::mem::size_of::<MarketEvent>() == 64);
const _: () = assert!(std::mem::align_of::<MarketEvent>() == 64);
const _: () = assert!(std::mem::size_of::<OrderRequest>() == 64);
const _: () = assert!(std::mem::align_of::<OrderRequest>() == 64);
const _: () = assert!(std::mem::size_of::<OrderResponse>() == 64);
const _: () = assert!(std::mem::align_of::<OrderResponse>() == 64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_carries_timestamp() {
        let before = timestamp_ns();
        let event = MarketEvent::tick(SymbolId::new(1), Price::from_f64(50_000.0), Quantity::from_f64(0.5));
        let after = timestamp_ns();

        assert_eq!(event.kind, MarketEventKind::Tick);
        assert!(event.timestamp_ns >= before);
        assert!(event.timestamp_ns <= after);
    }

    #[test]
    fn test_depth_fields() {
        let event = MarketEvent::depth(
            SymbolId::new(2),
            Price::from_f64(49_990.0),
            Price::from_f64(50_010.0),
        );

        assert_eq!(event.kind, MarketEventKind::Depth);
        assert_eq!(event.bid, Price::from_f64(49_990.0));
        assert_eq!(event.ask, Price::from_f64(50_010.0));
        assert_eq!(event.price, Price::ZERO);
    }

    #[test]
    fn test_order_request_gets_unique_ids() {
        let a = OrderRequest::new(
            SymbolId::new(1),
            Side::Buy,
            OrderKind::Limit,
            Price::from_f64(100.0),
            Quantity::from_f64(1.0),
        );
        let b = OrderRequest::new(
            SymbolId::new(1),
            Side::Sell,
            OrderKind::Market,
            Price::ZERO,
            Quantity::from_f64(1.0),
        );

        assert_ne!(a.order_id, b.order_id);
        assert_eq!(a.strategy_id, 0);
    }

    #[test]
    fn test_response_echoes_routing_key() {
        let mut request = OrderRequest::new(
            SymbolId::new(7),
            Side::Buy,
            OrderKind::Limit,
            Price::from_f64(100.0),
            Quantity::from_f64(1.0),
        );
        request.strategy_id = (1 << 16) | 3;

        let response = OrderResponse::filled(&request, request.price, request.quantity);
        assert_eq!(response.order_id, request.order_id);
        assert_eq!(response.strategy_id, request.strategy_id);
        assert_eq!(response.status, OrderStatus::Filled);

        let dropped = OrderResponse::dropped(&request);
        assert_eq!(dropped.status, OrderStatus::Dropped);
        assert_eq!(dropped.fill_quantity, Quantity::ZERO);
    }

    #[test]
    fn test_age_is_monotonic() {
        let event = MarketEvent::trade(SymbolId::new(1), Price::from_f64(1.0), Quantity::from_f64(1.0));
        let first = event.age_ns();
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(event.age_ns() > first);
    }
}
