pub mod config;
pub mod error;
pub mod poll;
pub mod query;
pub mod rpc;
pub mod utils;

// Re-export the pieces callers wire together
pub use error::{ProspectorError, Result};
pub use poll::{
    JsonFileStateStore, MemoryStateStore, PollConfig, PollLoop, PollState, StateStore, StatsEvent,
};
pub use query::{BalanceProbe, LiveBalanceQuery, SimulatedBalanceQuery};
pub use rpc::{
    EndpointConfig, EndpointHandle, EndpointPool, EndpointSelector, FailoverExecutor,
    HealthMonitor, RateGovernor,
};
