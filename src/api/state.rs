//! 應用狀態

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{ReqwestFetcher, SystemInterfaces, SystemResolver};
use crate::config::{AppConfig, ResponseMode};
use crate::core::events::{EventChannel, DEFAULT_KEEPALIVE_INTERVAL};
use crate::core::orchestrator::CheckOrchestrator;
use crate::core::prober::ReachabilityProber;

pub struct AppState {
    pub orchestrator: CheckOrchestrator,
    pub response_mode: ResponseMode,
    pub max_checks_per_request: usize,
    pub keepalive_interval: Duration,
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(orchestrator: CheckOrchestrator) -> Self {
        Self {
            orchestrator,
            response_mode: ResponseMode::default(),
            max_checks_per_request: 10_000,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            static_dir: None,
        }
    }

    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }

    pub fn with_max_checks(mut self, max: usize) -> Self {
        self.max_checks_per_request = max;
        self
    }

    /// 以系統網卡、系統 DNS 與 reqwest 組裝正式環境的狀態
    pub fn from_config(config: &AppConfig) -> Self {
        let probe_settings = config.probe_settings();
        let prober = ReachabilityProber::new(
            Arc::new(SystemResolver),
            Arc::new(ReqwestFetcher::new(probe_settings.clone())),
            probe_settings,
        );
        let events = EventChannel::new();
        let orchestrator = CheckOrchestrator::new(
            Arc::new(SystemInterfaces::new()),
            Arc::new(prober),
            events,
            config.orchestrator_settings(),
        );

        Self {
            orchestrator,
            response_mode: config.server.response_mode,
            max_checks_per_request: config.orchestrator.max_checks_per_request,
            keepalive_interval: config.keepalive_interval(),
            static_dir: config.static_dir(),
        }
    }

    pub fn events(&self) -> &EventChannel {
        self.orchestrator.events()
    }
}
