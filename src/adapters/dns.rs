use crate::core::NameResolver;
use async_trait::async_trait;

/// 系統解析器 (getaddrinfo)，不綁定網卡，只確認名稱存在
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl NameResolver for SystemResolver {
    async fn resolves(&self, host: &str, port: u16) -> bool {
        match tokio::net::lookup_host((host, port)).await {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(e) => {
                tracing::debug!("lookup {} failed: {}", host, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ip_literals_resolve() {
        assert!(SystemResolver.resolves("127.0.0.1", 80).await);
    }

    #[tokio::test]
    async fn test_reserved_tld_does_not_resolve() {
        assert!(!SystemResolver.resolves("simcheck.invalid", 443).await);
    }
}
