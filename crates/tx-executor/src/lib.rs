pub mod config;
pub mod executor;
pub mod fee;

pub use config::ExecutorConfig;
pub use executor::{Executor, InstructionOutcome};
pub use fee::{PriorityFeeTracker, MIN_PRIORITY_FEE_MICROLAMPORTS};
