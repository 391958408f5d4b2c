// Adapters layer: concrete implementations for the host system (interfaces, dns, http).

pub mod dns;
pub mod http;
pub mod interfaces;

pub use dns::SystemResolver;
pub use http::ReqwestFetcher;
pub use interfaces::SystemInterfaces;
