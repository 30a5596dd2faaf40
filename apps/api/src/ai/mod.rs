pub mod client;
pub mod handlers;
pub mod provider;
pub mod service;

pub use client::ProviderClient;
pub use provider::ProviderKeys;
pub use service::AiService;
