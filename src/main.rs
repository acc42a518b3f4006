use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::signal;
use tracing::{info, Level};

use event_engine::{
    AckExecutor, Engine, MarketEvent, MarketEventKind, OrderKind, OrderRequest, OrderResponse,
    OrderStatus, Price, Quantity, Side, Strategy, SymbolId,
};
use tachyon::config::SystemConfig;
use tachyon::latency::LatencyStats;
use tachyon::utils::format_duration_ns;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Buys a fixed clip whenever a tick prints above the last seen price.
struct MomentumTaker {
    clip: Quantity,
    last_price: Option<Price>,
    pending: Option<OrderRequest>,
}

impl MomentumTaker {
    fn new(clip: Quantity) -> Self {
        Self {
            clip,
            last_price: None,
            pending: None,
        }
    }
}

impl Strategy for MomentumTaker {
    fn name(&self) -> &str {
        "momentum-taker"
    }

    fn on_market_event(&mut self, event: &MarketEvent) -> bool {
        if event.kind != MarketEventKind::Tick {
            return false;
        }

        let rising = self.last_price.map_or(false, |last| event.price > last);
        self.last_price = Some(event.price);

        if rising {
            self.pending = Some(OrderRequest::new(
                event.symbol,
                Side::Buy,
                OrderKind::Market,
                event.price,
                self.clip,
            ));
        }
        self.pending.is_some()
    }

    fn take_pending_order(&mut self) -> Option<OrderRequest> {
        self.pending.take()
    }

    fn on_order_response(&mut self, response: &OrderResponse) {
        match response.status {
            OrderStatus::Filled => info!(
                "momentum fill: order {} {} @ {}",
                response.order_id, response.fill_quantity, response.fill_price
            ),
            OrderStatus::Dropped => info!("momentum order {} dropped (queue full)", response.order_id),
            _ => {}
        }
    }
}

/// Joins the bid whenever the book tightens below a spread threshold.
struct SpreadMaker {
    max_spread: Price,
    clip: Quantity,
    pending: Option<OrderRequest>,
}

impl SpreadMaker {
    fn new(max_spread: Price, clip: Quantity) -> Self {
        Self {
            max_spread,
            clip,
            pending: None,
        }
    }
}

impl Strategy for SpreadMaker {
    fn name(&self) -> &str {
        "spread-maker"
    }

    fn on_market_event(&mut self, event: &MarketEvent) -> bool {
        if event.kind != MarketEventKind::Depth {
            return false;
        }

        if event.ask - event.bid <= self.max_spread {
            self.pending = Some(OrderRequest::new(
                event.symbol,
                Side::Buy,
                OrderKind::Limit,
                event.bid,
                self.clip,
            ));
        }
        self.pending.is_some()
    }

    fn take_pending_order(&mut self) -> Option<OrderRequest> {
        self.pending.take()
    }

    fn on_order_response(&mut self, response: &OrderResponse) {
        if response.status == OrderStatus::Filled {
            info!(
                "maker fill: order {} {} @ {}",
                response.order_id, response.fill_quantity, response.fill_price
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting Tachyon trading core v{}", env!("CARGO_PKG_VERSION"));

    let config = SystemConfig::load_from_file("tachyon.toml").unwrap_or_default();
    info!("Configured symbols: {:?}", config.symbols);

    let engine = Arc::new(Engine::new(config.engine_config(), Box::new(AckExecutor))?);
    engine.add_strategy_group_a(Box::new(MomentumTaker::new(Quantity::from_f64(0.01))))?;
    engine.add_strategy_group_b(Box::new(SpreadMaker::new(
        Price::from_f64(2.0),
        Quantity::from_f64(0.05),
    )))?;
    engine.start()?;

    // Independent fan-out tap measuring publish-to-observe latency.
    let stats = Arc::new(LatencyStats::new());
    let tap_running = Arc::new(AtomicBool::new(true));
    let tap_handle = {
        let mut consumer = engine.subscribe();
        let stats = Arc::clone(&stats);
        let tap_running = Arc::clone(&tap_running);
        thread::spawn(move || {
            while tap_running.load(Ordering::Acquire) {
                match consumer.try_next() {
                    Some(event) => stats.record(event.age_ns()),
                    None => thread::yield_now(),
                }
            }
        })
    };

    // Synthetic ingestion thread standing in for the exchange feed adapters.
    let feed_handle = {
        let engine = Arc::clone(&engine);
        let symbol_count = config.symbols.len().max(1) as u64;
        thread::spawn(move || {
            engine.pin_ingest_thread();
            for i in 0..10_000u64 {
                let symbol = SymbolId::new((i % symbol_count) as u32);
                let price = Price::from_f64(50_000.0 + (i % 200) as f64);
                if i % 5 == 0 {
                    engine.publish_depth(symbol, price, price + Price::from_f64(1.0));
                } else {
                    engine.publish_tick(symbol, price, Quantity::from_f64(0.01));
                }
            }
        })
    };

    feed_handle.join().expect("feed thread panicked");
    tokio::time::sleep(Duration::from_millis(200)).await;

    info!("=== Latency (publish to tap) ===");
    info!(
        "events={} min={} mean={} max={}",
        stats.count(),
        stats.min_ns().map_or_else(|| "-".to_string(), format_duration_ns),
        stats.mean_ns().map_or_else(|| "-".to_string(), format_duration_ns),
        stats.max_ns().map_or_else(|| "-".to_string(), format_duration_ns),
    );

    info!("System running. Press Ctrl+C to stop...");
    signal::ctrl_c().await?;

    engine.stop()?;
    tap_running.store(false, Ordering::Release);
    tap_handle.join().expect("tap thread panicked");

    info!("Tachyon shutdown complete");
    Ok(())
}
