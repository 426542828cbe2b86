use nasiya_engine::StoreError;

/// Error type for gateway calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport failure (DNS, connect, timeout) after all retries
    Network(String),
    /// 401 / 403
    Auth(u16, String),
    /// Non-retryable 4xx, or an API-level refusal
    Rejected(u16, String),
    /// 429 / 5xx after all retries
    Upstream(u16, String),
    /// Too many consecutive failures; calls fail fast until the cooldown ends
    CircuitOpen(&'static str),
    /// Response body did not have the expected shape
    Parse(String),
    /// Service-account key missing, unreadable or refused
    Credentials(String),
}

impl GatewayError {
    pub fn is_auth(&self) -> bool {
        matches!(self, GatewayError::Auth(..))
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Network(msg) => write!(f, "Network error: {}", msg),
            GatewayError::Auth(code, msg) => write!(f, "Auth failed ({}): {}", code, msg),
            GatewayError::Rejected(code, msg) => write!(f, "Rejected ({}): {}", code, msg),
            GatewayError::Upstream(code, msg) => write!(f, "Upstream error ({}): {}", code, msg),
            GatewayError::CircuitOpen(service) => {
                write!(f, "{} temporarily unavailable (circuit open)", service)
            }
            GatewayError::Parse(msg) => write!(f, "Parse error: {}", msg),
            GatewayError::Credentials(msg) => write!(f, "Credentials error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for StoreError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Network(_) | GatewayError::Upstream(..) | GatewayError::CircuitOpen(_) => {
                StoreError::Unavailable(e.to_string())
            }
            GatewayError::Auth(..) | GatewayError::Rejected(..) | GatewayError::Credentials(_) => {
                StoreError::Rejected(e.to_string())
            }
            GatewayError::Parse(_) => StoreError::Malformed(e.to_string()),
        }
    }
}
