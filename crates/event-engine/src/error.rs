use crate::strategy::StrategyGroup;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("capacity must be a nonzero power of two, got {0}")]
    CapacityNotPowerOfTwo(usize),

    #[error("engine has already been started; build a new engine to run again")]
    AlreadyStarted,

    #[error("engine is not running")]
    NotRunning,

    #[error("strategy registration is closed once the engine has started")]
    RegistrationClosed,

    #[error("strategy group {0:?} is full")]
    GroupFull(StrategyGroup),

    #[error("core {core} is out of range for this machine ({available} cpus)")]
    CoreOutOfRange { core: usize, available: usize },

    #[error("failed to spawn {role} thread: {reason}")]
    ThreadSpawn { role: String, reason: String },
}
