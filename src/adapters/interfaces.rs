use crate::core::InterfaceResolver;
use std::net::{IpAddr, Ipv4Addr};

/// 每次呼叫都重新列舉系統網卡，不做快取
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl SystemInterfaces {
    pub fn new() -> Self {
        Self
    }

    /// 列出目前所有具非 loopback IPv4 位址的網卡
    pub fn list(&self) -> Vec<(String, Ipv4Addr)> {
        match if_addrs::get_if_addrs() {
            Ok(interfaces) => interfaces
                .into_iter()
                .filter_map(|iface| match iface.ip() {
                    IpAddr::V4(ip) if !ip.is_loopback() => Some((iface.name, ip)),
                    _ => None,
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Failed to enumerate network interfaces: {}", e);
                Vec::new()
            }
        }
    }
}

impl InterfaceResolver for SystemInterfaces {
    fn resolve(&self, interface: &str) -> Option<Ipv4Addr> {
        let found = self
            .list()
            .into_iter()
            .find(|(name, _)| name == interface)
            .map(|(_, ip)| ip);
        if found.is_none() {
            tracing::debug!("Interface '{}' has no usable IPv4 address", interface);
        }
        found
    }
}
