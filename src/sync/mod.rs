pub mod driver;

pub use driver::{ChunkPlan, Sleeper, SyncDriver, SyncOutcome, TokioSleeper};
