use crate::core::{HttpFetcher, NameResolver, ProbeOutcome, Reachability};
use crate::domain::model::HttpsStatusPolicy;
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use url::{Host, Url};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// 每次 HTTP 嘗試的總逾時
    pub timeout: Duration,
    pub https_status_policy: HttpsStatusPolicy,
    pub http_fallback: bool,
    pub max_redirects: usize,
    pub accept_invalid_certs: bool,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            https_status_policy: HttpsStatusPolicy::default(),
            http_fallback: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            accept_invalid_certs: false,
        }
    }
}

/// 由使用者輸入的 domain 推導出的探測目標
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
    pub https: Url,
    pub http: Url,
}

impl ProbeTarget {
    /// 去除前後空白、誤貼的 scheme 與結尾斜線；無法組成 URL 時回傳 None
    pub fn parse(domain: &str) -> Option<Self> {
        let trimmed = domain.trim();
        let bare = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed)
            .trim_end_matches('/');
        if bare.is_empty() {
            return None;
        }

        let https = Url::parse(&format!("https://{}", bare)).ok()?;
        let http = Url::parse(&format!("http://{}", bare)).ok()?;
        let host = match https.host()? {
            Host::Domain(name) => name.to_string(),
            Host::Ipv4(addr) => addr.to_string(),
            Host::Ipv6(addr) => addr.to_string(),
        };
        let port = https.port_or_known_default()?;

        Some(Self {
            host,
            port,
            https,
            http,
        })
    }
}

#[derive(Debug)]
enum ProbeState {
    DnsCheck,
    HttpsAttempt,
    HttpAttempt,
    Done(ProbeOutcome),
}

/// DNS_CHECK -> HTTPS_ATTEMPT -> (HTTP_ATTEMPT) 依序執行的探測器
pub struct ReachabilityProber {
    resolver: Arc<dyn NameResolver>,
    fetcher: Arc<dyn HttpFetcher>,
    settings: ProbeSettings,
}

impl ReachabilityProber {
    pub fn new(
        resolver: Arc<dyn NameResolver>,
        fetcher: Arc<dyn HttpFetcher>,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            settings,
        }
    }

    fn after_https_failure(&self) -> ProbeState {
        if self.settings.http_fallback {
            ProbeState::HttpAttempt
        } else {
            ProbeState::Done(ProbeOutcome::HttpsFailed)
        }
    }

    async fn step(&self, state: ProbeState, target: &ProbeTarget, local: IpAddr) -> ProbeState {
        match state {
            ProbeState::DnsCheck => {
                if self.resolver.resolves(&target.host, target.port).await {
                    ProbeState::HttpsAttempt
                } else {
                    tracing::debug!("DNS lookup failed for {}", target.host);
                    ProbeState::Done(ProbeOutcome::DnsFailed)
                }
            }
            ProbeState::HttpsAttempt => match self.fetcher.fetch(&target.https, local).await {
                Ok(code) if self.settings.https_status_policy.accepts(code) => {
                    ProbeState::Done(ProbeOutcome::HttpsAnswered(code))
                }
                Ok(code) => {
                    tracing::debug!("{} answered HTTPS {} via {}, not accepted", target.host, code, local);
                    self.after_https_failure()
                }
                Err(e) => {
                    tracing::debug!("HTTPS to {} via {} failed: {}", target.host, local, e);
                    self.after_https_failure()
                }
            },
            ProbeState::HttpAttempt => match self.fetcher.fetch(&target.http, local).await {
                Ok(code) => ProbeState::Done(ProbeOutcome::HttpAnswered(code)),
                Err(e) => {
                    tracing::debug!("HTTP to {} via {} failed: {}", target.host, local, e);
                    ProbeState::Done(ProbeOutcome::HttpFailed)
                }
            },
            done @ ProbeState::Done(_) => done,
        }
    }
}

#[async_trait]
impl Reachability for ReachabilityProber {
    async fn probe(&self, domain: &str, local_address: Ipv4Addr) -> ProbeOutcome {
        let Some(target) = ProbeTarget::parse(domain) else {
            tracing::debug!("'{}' is not a usable host name", domain);
            return ProbeOutcome::DnsFailed;
        };
        let local = IpAddr::V4(local_address);

        let mut state = ProbeState::DnsCheck;
        loop {
            state = match self.step(state, &target, local).await {
                ProbeState::Done(outcome) => return outcome,
                next => next,
            };
        }
    }
}
