/// Errors returned by the table API client.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// No base URL or API key configured
    NotConfigured,
    /// The request never got a response
    Network(String),
    /// The API key was rejected
    Unauthorized,
    /// The addressed record does not exist remotely
    NotFound,
    /// Any other non-success status
    Status(u16, String),
    /// The response body was not what the API promises
    Decode(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::NotConfigured => write!(
                f,
                "Remote not configured. Add remote.base_url and remote.api_key to config."
            ),
            RemoteError::Network(e) => write!(f, "Network error: {}", e),
            RemoteError::Unauthorized => write!(f, "Remote rejected the API key"),
            RemoteError::NotFound => write!(f, "Remote record not found"),
            RemoteError::Status(code, body) if body.is_empty() => {
                write!(f, "Remote returned HTTP {}", code)
            }
            RemoteError::Status(code, body) => write!(f, "Remote returned HTTP {}: {}", code, body),
            RemoteError::Decode(e) => write!(f, "Invalid remote response: {}", e),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Network(e.to_string())
        }
    }
}
