//! Configuration management

use anyhow::Result;
use event_engine::{EngineConfig, SymbolId, ThreadConfig, WaitStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub symbols: Vec<String>,
    pub engine: EngineSettings,
    pub threads: ThreadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub ring_capacity: usize,
    pub order_queue_capacity: usize,
    pub response_queue_capacity: usize,
    pub wait: WaitStrategy,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            symbols: vec!["BTC-USDT".to_string(), "ETH-USDT".to_string()],
            engine: EngineSettings {
                ring_capacity: defaults.ring_capacity,
                order_queue_capacity: defaults.order_queue_capacity,
                response_queue_capacity: defaults.response_queue_capacity,
                wait: defaults.wait,
            },
            threads: ThreadConfig::default(),
        }
    }
}

impl SystemConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SystemConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            ring_capacity: self.engine.ring_capacity,
            order_queue_capacity: self.engine.order_queue_capacity,
            response_queue_capacity: self.engine.response_queue_capacity,
            threads: self.threads.clone(),
            wait: self.engine.wait,
        }
    }

    /// Symbol ids are positions in the configured symbol list.
    pub fn symbol_id(&self, symbol: &str) -> Option<SymbolId> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|index| SymbolId::new(index as u32))
    }
}
