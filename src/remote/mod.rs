//! Client side of the hosted table API.
//!
//! [`RemoteStore`] speaks the REST half (select, insert, upsert, update,
//! delete, count) and [`realtime::subscribe`] the push half, a WebSocket per
//! table that announces every write.

mod client;
mod error;
pub mod realtime;
pub mod wire;

pub use client::RemoteStore;
pub use error::RemoteError;
pub use wire::{ChangeEvent, ChangeKind};

/// Converts an http(s) base URL to its ws(s) counterpart.
pub(crate) fn websocket_base(base_url: &str) -> String {
    if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if base_url.starts_with("ws://") || base_url.starts_with("wss://") {
        base_url.to_string()
    } else {
        format!("ws://{}", base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_base_from_http() {
        assert_eq!(websocket_base("http://localhost:8080"), "ws://localhost:8080");
    }

    #[test]
    fn test_websocket_base_from_https() {
        assert_eq!(
            websocket_base("https://school.example.com"),
            "wss://school.example.com"
        );
    }

    #[test]
    fn test_websocket_base_bare_host() {
        assert_eq!(websocket_base("localhost:8080"), "ws://localhost:8080");
        assert_eq!(websocket_base("ws://localhost:8080"), "ws://localhost:8080");
    }
}
