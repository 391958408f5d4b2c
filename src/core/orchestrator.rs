use crate::core::events::EventChannel;
use crate::core::{InterfaceResolver, Reachability};
use crate::domain::model::{ChannelEvent, CheckRequest, CheckResult, CheckStatus, CheckTask, Verbosity};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct OrchestratorSettings {
    pub verbosity: Verbosity,
    /// None 代表不限制同時執行的檢查數
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_finished(&self) -> bool {
        self.completed == self.total
    }
}

#[derive(Default)]
struct SessionState {
    completed: usize,
    results: Vec<(usize, CheckResult)>,
}

/// 一個檢查請求的執行期狀態
pub struct Session {
    id: String,
    total: usize,
    started_at: DateTime<Utc>,
    state: Mutex<SessionState>,
}

impl Session {
    fn new(total: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            total,
            started_at: Utc::now(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn progress(&self) -> Progress {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Progress {
            completed: state.completed,
            total: self.total,
        }
    }

    /// 記錄一筆完成的結果；計數不會超過 total
    fn record(&self, index: usize, result: CheckResult) -> Option<Progress> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.completed >= self.total {
            return None;
        }
        state.completed += 1;
        state.results.push((index, result));
        Some(Progress {
            completed: state.completed,
            total: self.total,
        })
    }

    /// 依展開順序排列的結果
    pub fn results(&self) -> Vec<CheckResult> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ordered = state.results.clone();
        ordered.sort_by_key(|(index, _)| *index);
        ordered.into_iter().map(|(_, result)| result).collect()
    }
}

pub struct SessionHandle {
    session: Arc<Session>,
    coordinator: JoinHandle<()>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        self.session.id()
    }

    pub fn total_checks(&self) -> usize {
        self.session.total()
    }

    pub fn progress(&self) -> Progress {
        self.session.progress()
    }

    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    /// 等待所有檢查完成，回傳依展開順序排列的結果
    pub async fn wait(self) -> Vec<CheckResult> {
        if let Err(e) = self.coordinator.await {
            tracing::error!("Session {} coordinator failed: {}", self.session.id(), e);
        }
        self.session.results()
    }
}

/// 展開 domain × path 檢查矩陣並同時派發
#[derive(Clone)]
pub struct CheckOrchestrator {
    interfaces: Arc<dyn InterfaceResolver>,
    prober: Arc<dyn Reachability>,
    events: EventChannel,
    settings: OrchestratorSettings,
    limiter: Option<Arc<Semaphore>>,
}

impl CheckOrchestrator {
    pub fn new(
        interfaces: Arc<dyn InterfaceResolver>,
        prober: Arc<dyn Reachability>,
        events: EventChannel,
        settings: OrchestratorSettings,
    ) -> Self {
        let limiter = settings
            .max_concurrency
            .filter(|limit| *limit > 0)
            .map(|limit| Arc::new(Semaphore::new(limit)));
        Self {
            interfaces,
            prober,
            events,
            settings,
            limiter,
        }
    }

    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    pub fn verbosity(&self) -> Verbosity {
        self.settings.verbosity
    }

    /// 立即回傳；檢查在背景執行，結果透過事件通道發布
    ///
    /// 必須在 tokio runtime 內呼叫。
    pub fn submit(&self, request: CheckRequest) -> SessionHandle {
        let tasks = request.expand();
        let session = Arc::new(Session::new(tasks.len()));
        tracing::info!(
            "🚀 Session {} started: {} domains × {} paths = {} checks",
            session.id(),
            request.domains.len(),
            request.sim_configs.len(),
            session.total()
        );

        let coordinator = tokio::spawn(self.clone().coordinate(Arc::clone(&session), tasks));
        SessionHandle {
            session,
            coordinator,
        }
    }

    /// 每個 session 唯一的彙整者：依完成順序記錄結果並發布事件
    async fn coordinate(self, session: Arc<Session>, tasks: Vec<CheckTask>) {
        let mut running = JoinSet::new();
        let mut pending = HashMap::with_capacity(tasks.len());

        for task in tasks {
            let worker = self.clone();
            let job = task.clone();
            let handle = running.spawn(async move { worker.run_task(job).await });
            pending.insert(handle.id(), task);
        }

        while let Some(joined) = running.join_next_with_id().await {
            let (index, result) = match joined {
                Ok((id, result)) => {
                    let index = pending.remove(&id).map(|task| task.index).unwrap_or_default();
                    (index, result)
                }
                Err(e) => {
                    let Some(task) = pending.remove(&e.id()) else {
                        tracing::error!("Session {}: unknown check task failed: {}", session.id(), e);
                        continue;
                    };
                    tracing::error!(
                        "Session {}: check {} via {} failed internally: {}",
                        session.id(),
                        task.domain,
                        task.path_label,
                        e
                    );
                    let index = task.index;
                    (index, task.into_result(self.settings.verbosity.fault_status(), None))
                }
            };

            let Some(progress) = session.record(index, result.clone()) else {
                tracing::warn!("Session {} received a result beyond its total", session.id());
                continue;
            };
            tracing::debug!(
                "[{}/{}] {} via {} ({}) -> {:?}",
                progress.completed,
                progress.total,
                result.domain,
                result.sim,
                result.interface,
                result.status
            );
            self.events.publish(ChannelEvent::Result {
                session_id: session.id().to_string(),
                result,
            });
        }

        let progress = session.progress();
        let elapsed = Utc::now() - session.started_at();
        tracing::info!(
            "✅ Session {} complete: {}/{} checks in {}ms",
            session.id(),
            progress.completed,
            progress.total,
            elapsed.num_milliseconds()
        );
        self.events.publish(ChannelEvent::Complete {
            session_id: session.id().to_string(),
            total_checks: progress.total,
            completed: progress.completed,
        });
    }

    async fn run_task(&self, task: CheckTask) -> CheckResult {
        let Some(local_address) = self.interfaces.resolve(&task.interface) else {
            return task.into_result(CheckStatus::InvalidInterface, None);
        };

        // semaphore 不會被關閉，取得失敗時直接不限流執行
        let _permit = match &self.limiter {
            Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
            None => None,
        };

        let outcome = self.prober.probe(&task.domain, local_address).await;
        let (status, status_code) = self.settings.verbosity.classify(outcome);
        task.into_result(status, status_code)
    }
}
