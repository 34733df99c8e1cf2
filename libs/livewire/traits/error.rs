use thiserror::Error;

/// Main error type for livewire
#[derive(Error, Debug)]
pub enum LiveWireError {
    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed while an operation needed it
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Inbound frame did not decode into a message
    #[error("Parse error: {0}")]
    Parse(String),

    /// Operation requires an open connection
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// A registered handler reported a failure
    #[error("Handler error: {0}")]
    Handler(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No async runtime available for timers or I/O tasks
    #[error("Runtime unavailable: {0}")]
    Runtime(String),

    /// Generic error
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for livewire operations
pub type Result<T> = std::result::Result<T, LiveWireError>;
