pub mod worker;

pub use worker::SyncScheduler;
