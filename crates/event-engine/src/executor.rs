//! Execution-side collaborator seam
//!
//! The execution-consumer thread pairs the order queue with an
//! `OrderExecutor`. Real deployments plug in the exchange trading adapters
//! (OKX/Binance REST or WebSocket order placement) behind this trait; their
//! internals live outside this crate.

use crate::events::{OrderRequest, OrderResponse};

pub trait OrderExecutor: Send {
    fn execute(&mut self, request: &OrderRequest) -> OrderResponse;
}

/// Fills every request at its own price immediately. Demo and test collaborator.
#[derive(Debug, Default)]
pub struct AckExecutor;

impl OrderExecutor for AckExecutor {
    fn execute(&mut self, request: &OrderRequest) -> OrderResponse {
        OrderResponse::filled(request, request.price, request.quantity)
    }
}
