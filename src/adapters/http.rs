use crate::core::prober::ProbeSettings;
use crate::core::HttpFetcher;
use crate::utils::error::FetchError;
use async_trait::async_trait;
use reqwest::{redirect, Client};
use std::net::IpAddr;
use url::Url;

const USER_AGENT: &str = concat!("simcheck/", env!("CARGO_PKG_VERSION"));

/// 以 reqwest 送出綁定來源位址的 GET
///
/// 每次請求建立新的 Client，不共用連線池，確保請求真的從指定網卡送出。
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: ProbeSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }

    fn client_for(&self, local_address: IpAddr) -> Result<Client, FetchError> {
        Client::builder()
            .local_address(local_address)
            .timeout(self.settings.timeout)
            .redirect(redirect::Policy::limited(self.settings.max_redirects))
            .danger_accept_invalid_certs(self.settings.accept_invalid_certs)
            .pool_max_idle_per_host(0)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::from)
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &Url, local_address: IpAddr) -> Result<u16, FetchError> {
        let client = self.client_for(local_address)?;
        tracing::debug!("GET {} via {}", url, local_address);
        let response = client.get(url.clone()).send().await?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn test_fetch_returns_error_status_codes() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(404);
            })
            .await;

        let fetcher = ReqwestFetcher::new(ProbeSettings::default());
        let url = Url::parse(&server.url("/")).unwrap();

        assert_eq!(fetcher.fetch(&url, LOOPBACK).await, Ok(404));
        api_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_follows_redirects() {
        let server = MockServer::start_async().await;
        let final_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/landing");
                then.status(200).body("ok");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(301).header("Location", "/landing");
            })
            .await;

        let fetcher = ReqwestFetcher::new(ProbeSettings::default());
        let url = Url::parse(&server.url("/")).unwrap();

        assert_eq!(fetcher.fetch(&url, LOOPBACK).await, Ok(200));
        final_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).delay(Duration::from_millis(800));
            })
            .await;

        let settings = ProbeSettings {
            timeout: Duration::from_millis(100),
            ..ProbeSettings::default()
        };
        let fetcher = ReqwestFetcher::new(settings);
        let url = Url::parse(&server.url("/")).unwrap();

        assert_eq!(fetcher.fetch(&url, LOOPBACK).await, Err(FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_https_against_plain_http_server_fails() {
        let server = MockServer::start_async().await;
        let url = Url::parse(&format!("https://127.0.0.1:{}/", server.port())).unwrap();

        let fetcher = ReqwestFetcher::new(ProbeSettings::default());
        assert!(fetcher.fetch(&url, LOOPBACK).await.is_err());
    }
}
