/// Errors from the realtime client.
///
/// All of them are recoverable: the feed loop logs them, keeps serving the
/// polled view, and retries.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    /// Failed to establish the WebSocket subscription.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server sent a frame that could not be understood.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The polling request itself failed (network, DNS, TLS, decoding).
    #[error("Poll request failed: {0}")]
    Poll(#[from] reqwest::Error),

    /// The polling endpoint answered with a non-2xx status.
    #[error("Poll returned {status}: {body}")]
    PollStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}
