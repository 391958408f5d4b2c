pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use api::AppState;
pub use config::{AppConfig, ResponseMode};
pub use crate::core::{
    events::EventChannel,
    orchestrator::{CheckOrchestrator, SessionHandle},
    prober::ReachabilityProber,
};
pub use domain::model::{CheckRequest, CheckResult, CheckStatus, Verbosity};
pub use utils::error::{AppError, Result};
