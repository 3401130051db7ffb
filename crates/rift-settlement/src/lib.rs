//! Settlement core of the Rift platform: the fee-split settlement
//! primitive, the reward and banner distribution engines, and the
//! background scheduler that drives them.

pub mod banner;
pub mod errors;
pub mod reward;
pub mod scheduler;
pub mod service;

#[cfg(test)]
mod tests;

pub use banner::BannerEngine;
pub use errors::{EngineError, EngineResult, SettlementError};
pub use reward::RewardEngine;
pub use scheduler::Scheduler;
pub use service::{SettlementOutcome, SettlementService};
