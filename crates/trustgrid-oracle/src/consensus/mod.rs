//! Oracle consensus
//!
//! - [`engine`]: submission intake, per-key consensus checks, settlement
//! - [`algorithms`]: weighted average, median, majority
//! - [`rewards`]: accuracy- and reputation-scaled reward computation
//! - [`store`]: consensus record storage

pub mod algorithms;
pub mod engine;
pub mod rewards;
pub mod store;

pub use engine::{required_for, ConsensusEngine, SubmissionOutcome};
pub use rewards::{NodeReward, RewardOutcome, RewardSummary};
pub use store::{ConsensusStore, InMemoryConsensusStore, StoreError};
