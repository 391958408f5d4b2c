pub mod events;
pub mod orchestrator;
pub mod prober;

pub use crate::domain::model::{CheckRequest, CheckResult, CheckStatus, ProbeOutcome};
pub use crate::domain::ports::{HttpFetcher, InterfaceResolver, NameResolver, Reachability};
pub use crate::utils::error::Result;
