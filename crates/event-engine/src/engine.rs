//! Engine orchestration: one ring buffer, one order queue, dedicated threads
//!
//! The engine owns the only two shared mutable resources in the system — the
//! market event ring buffer and the order queue — and the threads that drain
//! them: one consumer thread per registered strategy group plus one
//! execution-consumer thread. Producers (exchange adapter threads) stay
//! outside; they inject events through the `publish_*` helpers.
//!
//! All hot-path coordination is acquire/release atomics. The `parking_lot`
//! locks below guard cold-path state only: pre-start registration and the
//! join handles.

use crate::affinity;
use crate::error::EngineError;
use crate::events::{MarketEvent, OrderRequest, OrderResponse};
use crate::executor::OrderExecutor;
use crate::queues::{MpscQueue, SpscQueue};
use crate::ring_buffer::{RingBuffer, RingConsumer};
use crate::strategy::{Strategy, StrategyGroup, StrategyState};
use crate::types::{Price, Quantity, SymbolId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// Behavior of a consumer thread while no new data is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitStrategy {
    /// Pure busy-spin with a CPU pause hint; lowest wake-up latency
    Spin,
    /// Yield to the scheduler on every idle iteration; friendlier on shared hosts
    SpinYield,
}

impl WaitStrategy {
    #[inline]
    pub fn idle(self) {
        match self {
            WaitStrategy::Spin => std::hint::spin_loop(),
            WaitStrategy::SpinYield => thread::yield_now(),
        }
    }
}

impl Default for WaitStrategy {
    fn default() -> Self {
        WaitStrategy::Spin
    }
}

/// Per-role core assignment; `None` leaves the role unpinned
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadConfig {
    pub enable_cpu_pinning: bool,
    pub ingest_core: Option<usize>,
    pub group_a_core: Option<usize>,
    pub group_b_core: Option<usize>,
    pub execution_core: Option<usize>,
}

impl ThreadConfig {
    fn group_core(&self, group_index: usize) -> Option<usize> {
        match group_index {
            0 => self.group_a_core,
            _ => self.group_b_core,
        }
    }

    fn assigned_cores(&self) -> impl Iterator<Item = usize> + '_ {
        [
            self.ingest_core,
            self.group_a_core,
            self.group_b_core,
            self.execution_core,
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Market event ring slots; must exceed the worst consumer lag
    pub ring_capacity: usize,
    pub order_queue_capacity: usize,
    pub response_queue_capacity: usize,
    pub threads: ThreadConfig,
    pub wait: WaitStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 65_536,
            order_queue_capacity: 4_096,
            response_queue_capacity: 4_096,
            threads: ThreadConfig::default(),
            wait: WaitStrategy::default(),
        }
    }
}

struct RegisteredStrategy {
    id: u32,
    name: String,
    strategy: Box<dyn Strategy>,
    state: StrategyState,
    faulted: bool,
}

pub struct Engine {
    config: EngineConfig,
    ring: Arc<RingBuffer<MarketEvent>>,
    order_queue: Arc<MpscQueue<OrderRequest>>,
    response_queues: Vec<Arc<SpscQueue<OrderResponse>>>,
    pending: Mutex<Vec<Vec<RegisteredStrategy>>>,
    executor: Mutex<Option<Box<dyn OrderExecutor>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
    started: AtomicBool,
}

impl Engine {
    pub fn new(config: EngineConfig, executor: Box<dyn OrderExecutor>) -> Result<Self, EngineError> {
        let ring = Arc::new(RingBuffer::with_capacity(config.ring_capacity)?);
        let order_queue = Arc::new(MpscQueue::with_capacity(config.order_queue_capacity)?);
        let response_queues = (0..StrategyGroup::COUNT)
            .map(|_| SpscQueue::with_capacity(config.response_queue_capacity).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        let pending = (0..StrategyGroup::COUNT).map(|_| Vec::new()).collect();

        Ok(Self {
            config,
            ring,
            order_queue,
            response_queues,
            pending: Mutex::new(pending),
            executor: Mutex::new(Some(executor)),
            handles: Mutex::new(Vec::new()),
            running: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
        })
    }

    /// Register a strategy into a fan-out group. Pre-start only.
    pub fn add_strategy(&self, group: StrategyGroup, strategy: Box<dyn Strategy>) -> Result<(), EngineError> {
        if self.started.load(Ordering::Acquire) {
            return Err(EngineError::RegistrationClosed);
        }

        let mut pending = self.pending.lock();
        let slot = pending[group.index()].len();
        if slot > u16::MAX as usize {
            return Err(EngineError::GroupFull(group));
        }

        let id = ((group.index() as u32) << 16) | slot as u32;
        let name = strategy.name().to_string();
        pending[group.index()].push(RegisteredStrategy {
            id,
            name,
            strategy,
            state: StrategyState::default(),
            faulted: false,
        });
        Ok(())
    }

    #[inline]
    pub fn add_strategy_group_a(&self, strategy: Box<dyn Strategy>) -> Result<(), EngineError> {
        self.add_strategy(StrategyGroup::A, strategy)
    }

    #[inline]
    pub fn add_strategy_group_b(&self, strategy: Box<dyn Strategy>) -> Result<(), EngineError> {
        self.add_strategy(StrategyGroup::B, strategy)
    }

    /// Spawn the consumer threads. An engine runs once; build a new one to restart.
    pub fn start(&self) -> Result<(), EngineError> {
        if self.config.threads.enable_cpu_pinning {
            for core in self.config.threads.assigned_cores() {
                if !affinity::core_in_range(core) {
                    return Err(EngineError::CoreOutOfRange {
                        core,
                        available: num_cpus::get(),
                    });
                }
            }
        }

        if self.started.swap(true, Ordering::AcqRel) {
            return Err(EngineError::AlreadyStarted);
        }

        self.running.store(true, Ordering::Release);

        let groups = std::mem::take(&mut *self.pending.lock());
        let executor = self
            .executor
            .lock()
            .take()
            .ok_or(EngineError::AlreadyStarted)?;

        let mut handles = Vec::new();
        let mut group_count = 0;

        for (index, strategies) in groups.into_iter().enumerate() {
            if strategies.is_empty() {
                continue;
            }
            group_count += 1;

            let name = format!("engine-group-{}", (b'a' + index as u8) as char);
            let consumer = RingConsumer::new(Arc::clone(&self.ring));
            let order_queue = Arc::clone(&self.order_queue);
            let responses = Arc::clone(&self.response_queues[index]);
            let running = Arc::clone(&self.running);
            let wait = self.config.wait;
            let pin_core = self
                .config
                .threads
                .enable_cpu_pinning
                .then(|| self.config.threads.group_core(index))
                .flatten();

            let thread_name = name.clone();
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    pin_if_requested(&thread_name, pin_core);
                    group_loop(consumer, strategies, order_queue, responses, running, wait);
                })
                .map_err(|e| EngineError::ThreadSpawn {
                    role: name,
                    reason: e.to_string(),
                })?;
            handles.push(handle);
        }

        let response_queues: Vec<_> = self.response_queues.iter().map(Arc::clone).collect();
        let order_queue = Arc::clone(&self.order_queue);
        let running = Arc::clone(&self.running);
        let wait = self.config.wait;
        let pin_core = self
            .config
            .threads
            .enable_cpu_pinning
            .then_some(self.config.threads.execution_core)
            .flatten();

        let handle = thread::Builder::new()
            .name("engine-exec".to_string())
            .spawn(move || {
                pin_if_requested("engine-exec", pin_core);
                execution_loop(order_queue, response_queues, executor, running, wait);
            })
            .map_err(|e| EngineError::ThreadSpawn {
                role: "engine-exec".to_string(),
                reason: e.to_string(),
            })?;
        handles.push(handle);

        *self.handles.lock() = handles;

        info!("engine started: {} strategy groups + execution consumer", group_count);
        Ok(())
    }

    /// Request cooperative shutdown and join every thread.
    ///
    /// Each thread observes the flag once per spin iteration; anything
    /// mid-flight in a queue when the flag flips is dropped, not corrupted.
    pub fn stop(&self) -> Result<(), EngineError> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Err(EngineError::NotRunning);
        }

        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if handle.join().is_err() {
                error!("engine thread panicked during shutdown");
            }
        }

        info!("engine stopped");
        Ok(())
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Direct access to the ring for collaborators using the claim/write/publish triad.
    #[inline]
    pub fn ring(&self) -> Arc<RingBuffer<MarketEvent>> {
        Arc::clone(&self.ring)
    }

    /// An additional independent fan-out consumer over the full event stream.
    #[inline]
    pub fn subscribe(&self) -> RingConsumer<MarketEvent> {
        RingConsumer::new(Arc::clone(&self.ring))
    }

    /// Pin the calling (producer) thread per `ThreadConfig::ingest_core`.
    ///
    /// The ingestion loop belongs to the exchange adapter, so the adapter
    /// thread calls this itself once at startup.
    pub fn pin_ingest_thread(&self) {
        if self.config.threads.enable_cpu_pinning {
            pin_if_requested("ingest", self.config.threads.ingest_core);
        }
    }

    /// Publish one pre-built event; returns its sequence.
    #[inline]
    pub fn publish_event(&self, event: MarketEvent) -> u64 {
        let sequence = self.ring.next();
        self.ring.write(sequence, event);
        self.ring.publish(sequence);
        sequence
    }

    #[inline]
    pub fn publish_tick(&self, symbol: SymbolId, price: Price, quantity: Quantity) -> u64 {
        self.publish_event(MarketEvent::tick(symbol, price, quantity))
    }

    #[inline]
    pub fn publish_trade(&self, symbol: SymbolId, price: Price, quantity: Quantity) -> u64 {
        self.publish_event(MarketEvent::trade(symbol, price, quantity))
    }

    #[inline]
    pub fn publish_kline(&self, symbol: SymbolId, close: Price, volume: Quantity) -> u64 {
        self.publish_event(MarketEvent::kline(symbol, close, volume))
    }

    #[inline]
    pub fn publish_depth(&self, symbol: SymbolId, bid: Price, ask: Price) -> u64 {
        self.publish_event(MarketEvent::depth(symbol, bid, ask))
    }
}

fn pin_if_requested(role: &str, core: Option<usize>) {
    if let Some(core) = core {
        match affinity::pin_to_core(core) {
            Ok(()) => info!("{} pinned to core {}", role, core),
            Err(e) => warn!("failed to pin {} to core {}: {}", role, core, e),
        }
    }
}

/// Strategy-group consumer: drain the ring, forward intents, deliver responses.
fn group_loop(
    mut consumer: RingConsumer<MarketEvent>,
    mut strategies: Vec<RegisteredStrategy>,
    order_queue: Arc<MpscQueue<OrderRequest>>,
    responses: Arc<SpscQueue<OrderResponse>>,
    running: Arc<AtomicBool>,
    wait: WaitStrategy,
) {
    while running.load(Ordering::Acquire) {
        let mut made_progress = false;

        if let Some(event) = consumer.try_next() {
            made_progress = true;
            for entry in strategies.iter_mut() {
                if entry.faulted {
                    continue;
                }

                entry.state = StrategyState::Evaluating;
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    if entry.strategy.on_market_event(&event) {
                        entry.strategy.take_pending_order()
                    } else {
                        None
                    }
                }));

                match outcome {
                    Ok(Some(mut request)) => {
                        entry.state = StrategyState::OrderPending;
                        request.strategy_id = entry.id;
                        if !order_queue.try_push(request) {
                            // Backpressure: bounce straight back to the emitter
                            let bounced = OrderResponse::dropped(&request);
                            let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
                                entry.strategy.on_order_response(&bounced)
                            }));
                            if delivered.is_err() {
                                entry.faulted = true;
                                error!(
                                    "strategy '{}' ({}) panicked in on_order_response and is quarantined",
                                    entry.name, entry.id
                                );
                            }
                        }
                        entry.state = StrategyState::Idle;
                    }
                    Ok(None) => {
                        entry.state = StrategyState::Idle;
                    }
                    Err(_) => {
                        error!(
                            "strategy '{}' ({}) panicked in state {:?} and is quarantined",
                            entry.name, entry.id, entry.state
                        );
                        entry.faulted = true;
                        entry.state = StrategyState::Idle;
                    }
                }
            }
        }

        while let Some(response) = responses.try_pop() {
            made_progress = true;
            let slot = (response.strategy_id & 0xffff) as usize;
            match strategies.get_mut(slot) {
                Some(entry) if !entry.faulted => {
                    let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
                        entry.strategy.on_order_response(&response)
                    }));
                    if delivered.is_err() {
                        entry.faulted = true;
                        error!(
                            "strategy '{}' ({}) panicked in on_order_response and is quarantined",
                            entry.name, entry.id
                        );
                    }
                }
                _ => {}
            }
        }

        if !made_progress {
            wait.idle();
        }
    }
}

/// Execution consumer: drain the order queue, execute, route responses back.
fn execution_loop(
    order_queue: Arc<MpscQueue<OrderRequest>>,
    response_queues: Vec<Arc<SpscQueue<OrderResponse>>>,
    mut executor: Box<dyn OrderExecutor>,
    running: Arc<AtomicBool>,
    wait: WaitStrategy,
) {
    while running.load(Ordering::Acquire) {
        match order_queue.try_pop() {
            Some(request) => {
                let response =
                    match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(&request))) {
                        Ok(response) => response,
                        Err(_) => {
                            error!("executor panicked on order {}", request.order_id);
                            OrderResponse::rejected(&request)
                        }
                    };

                let group = (request.strategy_id >> 16) as usize;
                match response_queues.get(group) {
                    Some(queue) => {
                        if !queue.try_push(response) {
                            warn!("response queue full; dropping response for order {}", request.order_id);
                        }
                    }
                    None => warn!("order {} carries an unknown group id", request.order_id),
                }
            }
            None => wait.idle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{OrderKind, OrderStatus};
    use crate::executor::AckExecutor;
    use crate::types::Side;
    use std::sync::atomic::AtomicU64;
    use std::time::{Duration, Instant};

    fn wait_until(deadline_ms: u64, mut predicate: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_millis(deadline_ms);
        while Instant::now() < deadline {
            if predicate() {
                return true;
            }
            thread::yield_now();
        }
        predicate()
    }

    struct CountingStrategy {
        events: Arc<AtomicU64>,
        fills: Arc<AtomicU64>,
        emit_on_first: bool,
        emitted: bool,
        pending: Option<OrderRequest>,
    }

    impl CountingStrategy {
        fn new(events: Arc<AtomicU64>, fills: Arc<AtomicU64>, emit_on_first: bool) -> Self {
            Self {
                events,
                fills,
                emit_on_first,
                emitted: false,
                pending: None,
            }
        }
    }

    impl Strategy for CountingStrategy {
        fn name(&self) -> &str {
            "counting"
        }

        fn on_market_event(&mut self, event: &MarketEvent) -> bool {
            self.events.fetch_add(1, Ordering::Relaxed);
            if self.emit_on_first && !self.emitted {
                self.emitted = true;
                self.pending = Some(OrderRequest::new(
                    event.symbol,
                    Side::Buy,
                    OrderKind::Limit,
                    event.price,
                    Quantity::from_f64(1.0),
                ));
                return true;
            }
            false
        }

        fn take_pending_order(&mut self) -> Option<OrderRequest> {
            self.pending.take()
        }

        fn on_order_response(&mut self, response: &OrderResponse) {
            if response.status == OrderStatus::Filled {
                self.fills.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[test]
    fn test_lifecycle() {
        let engine = Engine::new(EngineConfig::default(), Box::new(AckExecutor)).unwrap();
        assert!(!engine.is_running());

        engine.start().unwrap();
        assert!(engine.is_running());

        engine.stop().unwrap();
        assert!(!engine.is_running());
    }

    #[test]
    fn test_double_start_rejected() {
        let engine = Engine::new(EngineConfig::default(), Box::new(AckExecutor)).unwrap();
        engine.start().unwrap();
        assert_eq!(engine.start(), Err(EngineError::AlreadyStarted));
        engine.stop().unwrap();
    }

    #[test]
    fn test_stop_when_not_running_rejected() {
        let engine = Engine::new(EngineConfig::default(), Box::new(AckExecutor)).unwrap();
        assert_eq!(engine.stop(), Err(EngineError::NotRunning));
    }

    #[test]
    fn test_registration_closed_after_start() {
        let events = Arc::new(AtomicU64::new(0));
        let fills = Arc::new(AtomicU64::new(0));
        let engine = Engine::new(EngineConfig::default(), Box::new(AckExecutor)).unwrap();
        engine.start().unwrap();

        let result = engine.add_strategy(
            StrategyGroup::A,
            Box::new(CountingStrategy::new(events, fills, false)),
        );
        assert_eq!(result, Err(EngineError::RegistrationClosed));
        engine.stop().unwrap();
    }

    #[test]
    fn test_bad_capacity_rejected() {
        let config = EngineConfig {
            ring_capacity: 1000,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(config, Box::new(AckExecutor)),
            Err(EngineError::CapacityNotPowerOfTwo(1000))
        ));
    }

    #[test]
    fn test_event_to_response_round_trip() {
        let events = Arc::new(AtomicU64::new(0));
        let fills = Arc::new(AtomicU64::new(0));

        let engine = Engine::new(EngineConfig::default(), Box::new(AckExecutor)).unwrap();
        engine
            .add_strategy(
                StrategyGroup::A,
                Box::new(CountingStrategy::new(
                    Arc::clone(&events),
                    Arc::clone(&fills),
                    true,
                )),
            )
            .unwrap();
        engine.start().unwrap();

        engine.publish_tick(SymbolId::new(1), Price::from_f64(50_000.0), Quantity::from_f64(0.1));

        assert!(wait_until(2_000, || fills.load(Ordering::Relaxed) == 1));
        assert_eq!(events.load(Ordering::Relaxed), 1);

        engine.stop().unwrap();
    }
}
