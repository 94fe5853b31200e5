pub mod config;
pub mod fetch;
pub mod history;
pub mod notify;
pub mod process;
pub mod report;
pub mod sync;

pub use config::SyncConfig;
pub use report::{RunStats, RunSummary};
