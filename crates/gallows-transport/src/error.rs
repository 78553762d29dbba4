/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listening socket failed.
    #[error("bind to {addr} failed: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Accepting a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The frame header was not a padded decimal length.
    #[error("malformed frame header: {0:?}")]
    MalformedHeader(String),

    /// The announced (or outgoing) payload exceeds the frame limit.
    #[error("frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}
