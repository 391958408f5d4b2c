//! 檢查 API
//!
//! POST /check-domain (以及舊路徑 /api/check-domain)

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::config::ResponseMode;
use crate::domain::model::{CheckRequest, CheckResult};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckStartedResponse {
    pub message: String,
    pub total_checks: usize,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResultsResponse {
    pub results: Vec<CheckResult>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/check-domain", post(check_domain))
        .route("/api/check-domain", post(check_domain))
}

/// 觸發檢查
///
/// stream 模式立即回傳，結果從 /events 推送；sync 模式等待全部完成
async fn check_domain(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let request = normalize_request(request, state.max_checks_per_request)?;

    let handle = state.orchestrator.submit(request);

    match state.response_mode {
        ResponseMode::Stream => Ok(Json(CheckStartedResponse {
            message: "Check started".to_string(),
            total_checks: handle.total_checks(),
            session_id: handle.id().to_string(),
        })
        .into_response()),
        ResponseMode::Sync => {
            let session = handle.session();
            let results = handle.wait().await;
            let progress = session.progress();
            if !progress.is_finished() {
                return Err(ApiError::internal(format!(
                    "session {} stopped after {}/{} checks",
                    session.id(),
                    progress.completed,
                    progress.total
                )));
            }
            Ok(Json(CheckResultsResponse { results }).into_response())
        }
    }
}

/// 去除 domain 前後空白，拒絕空白欄位與過大的檢查矩陣
fn normalize_request(request: CheckRequest, max_checks: usize) -> ApiResult<CheckRequest> {
    let mut domains = Vec::with_capacity(request.domains.len());
    for domain in request.domains {
        let trimmed = domain.trim();
        if trimmed.is_empty() {
            return Err(ApiError::bad_request("domains must not contain blank entries"));
        }
        domains.push(trimmed.to_string());
    }

    for (label, interface) in &request.sim_configs {
        if label.trim().is_empty() || interface.trim().is_empty() {
            return Err(ApiError::bad_request(
                "simConfigs labels and interface names must not be blank",
            ));
        }
    }

    let request = CheckRequest::new(domains, request.sim_configs);
    if request.total_checks() > max_checks {
        return Err(ApiError::bad_request(format!(
            "{} checks requested, at most {} allowed per request",
            request.total_checks(),
            max_checks
        )));
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::PathConfig;

    fn sims(pairs: &[(&str, &str)]) -> PathConfig {
        pairs
            .iter()
            .map(|(l, i)| (l.to_string(), i.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_trims_domains() {
        let request = CheckRequest::new(
            vec![" example.com ".to_string(), "example.com".to_string()],
            sims(&[("sim1", "eth0")]),
        );
        let normalized = normalize_request(request, 100).unwrap();
        assert_eq!(normalized.domains, vec!["example.com", "example.com"]);
    }

    #[test]
    fn test_normalize_rejects_blank_entries() {
        let blank_domain = CheckRequest::new(vec!["  ".to_string()], sims(&[("sim1", "eth0")]));
        assert!(normalize_request(blank_domain, 100).is_err());

        let blank_interface = CheckRequest::new(vec!["a.com".to_string()], sims(&[("sim1", "")]));
        assert!(normalize_request(blank_interface, 100).is_err());
    }

    #[test]
    fn test_normalize_enforces_max_checks() {
        let request = CheckRequest::new(
            vec!["a.com".to_string(), "b.com".to_string()],
            sims(&[("sim1", "eth0"), ("sim2", "eth1")]),
        );
        assert!(normalize_request(request.clone(), 3).is_err());
        assert!(normalize_request(request, 4).is_ok());
    }
}
