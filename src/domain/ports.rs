use crate::domain::model::ProbeOutcome;
use crate::utils::error::FetchError;
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use url::Url;

/// 網卡名稱 -> 本機 IPv4 位址
pub trait InterfaceResolver: Send + Sync {
    fn resolve(&self, interface: &str) -> Option<Ipv4Addr>;
}

/// DNS 存在性檢查，使用系統預設解析器
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolves(&self, host: &str, port: u16) -> bool;
}

/// 綁定本機位址送出 GET，回傳 HTTP 狀態碼
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, local_address: IpAddr) -> Result<u16, FetchError>;
}

#[async_trait]
pub trait Reachability: Send + Sync {
    async fn probe(&self, domain: &str, local_address: Ipv4Addr) -> ProbeOutcome;
}
