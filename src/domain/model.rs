use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 路徑標籤 -> 網卡名稱 (例如 "sim1" -> "wwan0")
///
/// 使用 BTreeMap，展開時依標籤排序，結果順序可預期
pub type PathConfig = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub domains: Vec<String>,
    pub sim_configs: PathConfig,
}

impl CheckRequest {
    pub fn new(domains: Vec<String>, sim_configs: PathConfig) -> Self {
        Self {
            domains,
            sim_configs,
        }
    }

    pub fn total_checks(&self) -> usize {
        self.domains.len() * self.sim_configs.len()
    }

    /// 展開成 domain × path 的完整檢查清單 (domain 為主序)
    pub fn expand(&self) -> Vec<CheckTask> {
        let mut tasks = Vec::with_capacity(self.total_checks());
        for domain in &self.domains {
            for (label, interface) in &self.sim_configs {
                tasks.push(CheckTask {
                    index: tasks.len(),
                    domain: domain.clone(),
                    path_label: label.clone(),
                    interface: interface.clone(),
                });
            }
        }
        tasks
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTask {
    /// 在展開順序中的位置
    pub index: usize,
    pub domain: String,
    pub path_label: String,
    pub interface: String,
}

impl CheckTask {
    pub fn into_result(self, status: CheckStatus, status_code: Option<u16>) -> CheckResult {
        CheckResult {
            domain: self.domain,
            sim: self.path_label,
            interface: self.interface,
            status,
            status_code,
            checked_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub domain: String,
    pub sim: String,
    pub interface: String,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub checked_at: DateTime<Utc>,
}

/// 對外公開的檢查狀態
///
/// 同一個部署只會用到其中一組：simple 用 Accessible/Blocked，
/// verbose 用 DNSError/HTTPSOk/HTTPOk/HTTPSFailed/HTTPFailed。
/// InvalidInterface 兩組共用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckStatus {
    Accessible,
    Blocked,
    InvalidInterface,
    #[serde(rename = "DNSError")]
    DnsError,
    #[serde(rename = "HTTPSOk")]
    HttpsOk,
    #[serde(rename = "HTTPOk")]
    HttpOk,
    #[serde(rename = "HTTPSFailed")]
    HttpsFailed,
    #[serde(rename = "HTTPFailed")]
    HttpFailed,
}

impl CheckStatus {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Accessible | Self::HttpsOk | Self::HttpOk)
    }
}

/// 單次探測的內部結果，經 Verbosity 轉換成 CheckStatus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    DnsFailed,
    HttpsAnswered(u16),
    HttpAnswered(u16),
    /// HTTPS 失敗且未啟用 HTTP fallback
    HttpsFailed,
    /// HTTPS 與 HTTP 都沒有回應
    HttpFailed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    #[default]
    Simple,
    Verbose,
}

impl Verbosity {
    pub fn classify(self, outcome: ProbeOutcome) -> (CheckStatus, Option<u16>) {
        match (self, outcome) {
            (Self::Simple, ProbeOutcome::HttpsAnswered(_) | ProbeOutcome::HttpAnswered(_)) => {
                (CheckStatus::Accessible, None)
            }
            (Self::Simple, _) => (CheckStatus::Blocked, None),
            (Self::Verbose, ProbeOutcome::DnsFailed) => (CheckStatus::DnsError, None),
            (Self::Verbose, ProbeOutcome::HttpsAnswered(code)) => {
                (CheckStatus::HttpsOk, Some(code))
            }
            (Self::Verbose, ProbeOutcome::HttpAnswered(code)) => (CheckStatus::HttpOk, Some(code)),
            (Self::Verbose, ProbeOutcome::HttpsFailed) => (CheckStatus::HttpsFailed, None),
            (Self::Verbose, ProbeOutcome::HttpFailed) => (CheckStatus::HttpFailed, None),
        }
    }

    /// 任務內部錯誤 (例如 panic) 時的狀態，視同無法連線
    pub fn fault_status(self) -> CheckStatus {
        match self {
            Self::Simple => CheckStatus::Blocked,
            Self::Verbose => CheckStatus::HttpFailed,
        }
    }
}

/// HTTPS 回應碼的判定方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpsStatusPolicy {
    /// 任何 HTTP 狀態碼都算可連線
    #[default]
    AnyStatus,
    /// 只有 2xx 算可連線，其餘改走 HTTP fallback
    SuccessOnly,
}

impl HttpsStatusPolicy {
    pub fn accepts(self, status: u16) -> bool {
        match self {
            Self::AnyStatus => true,
            Self::SuccessOnly => (200..=299).contains(&status),
        }
    }
}

/// 事件通道上傳遞的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChannelEvent {
    #[serde(rename_all = "camelCase")]
    Result {
        session_id: String,
        result: CheckResult,
    },
    #[serde(rename_all = "camelCase")]
    Complete {
        session_id: String,
        total_checks: usize,
        completed: usize,
    },
    #[serde(rename = "keepalive")]
    KeepAlive,
}

impl ChannelEvent {
    /// SSE `event:` 欄位名稱
    pub fn name(&self) -> &'static str {
        match self {
            Self::Result { .. } => "result",
            Self::Complete { .. } => "complete",
            Self::KeepAlive => "keepalive",
        }
    }
}
