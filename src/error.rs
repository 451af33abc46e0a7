use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Callers match on these,
// never on the human-readable message string.

/// Stable error code constants returned by [`PagerError::error_code`].
pub mod error_code {
    pub const CONFIGURATION: &str = "CONFIGURATION";
    pub const INVALID_QUERY: &str = "INVALID_QUERY";
    pub const NETWORK: &str = "NETWORK";
    pub const SERVER: &str = "SERVER";
    pub const RPC: &str = "RPC";
    pub const AUTH: &str = "AUTH";
    pub const DECODE: &str = "DECODE";
    pub const MAPPING: &str = "MAPPING";
    pub const TRANSPORT: &str = "TRANSPORT";
}

// ── PagerError ──────────────────────────────────────────────────────

/// Error type shared by the query builder, the mapper, the sync adapter
/// and every transport.
///
/// `Configuration` is the only variant raised synchronously (when a
/// [`ModelConfig`](crate::ModelConfig) is built). Everything else is the
/// `Err` of an async operation, and leaves the calling collection as it was.
#[derive(Error, Debug)]
pub enum PagerError {
    /// The collection cannot talk to the backend as declared
    /// (e.g. no backend model name).
    #[error("configuration: {0}")]
    Configuration(String),

    /// Fetch options that cannot be expressed as an RPC call.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx HTTP reply.
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// JSON-RPC `error` member returned by the backend.
    #[error("rpc {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("auth: {0}")]
    Auth(String),

    #[error("decode: {0}")]
    Decode(String),

    /// The RPC reply does not have the shape the call promises.
    #[error("mapping: {0}")]
    Mapping(String),

    /// Failure raised by a non-HTTP transport (test doubles, proxies).
    #[error("transport: {0}")]
    Transport(String),
}

impl PagerError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            PagerError::Configuration(_) => error_code::CONFIGURATION,
            PagerError::InvalidQuery(_) => error_code::INVALID_QUERY,
            PagerError::Network(_) => error_code::NETWORK,
            PagerError::Server { .. } => error_code::SERVER,
            PagerError::Rpc { .. } => error_code::RPC,
            PagerError::Auth(_) => error_code::AUTH,
            PagerError::Decode(_) => error_code::DECODE,
            PagerError::Mapping(_) => error_code::MAPPING,
            PagerError::Transport(_) => error_code::TRANSPORT,
        }
    }

    /// Whether the failure happened before any request left the process.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            PagerError::Configuration(_) | PagerError::InvalidQuery(_)
        )
    }
}
