pub mod client;
pub mod readiness;
pub mod types;

pub use client::{ImmichApi, ImmichClient};
pub use readiness::ReadinessGate;
pub use types::{ServerAbout, ServerStatistics, ServerStorage, UserUsage};
