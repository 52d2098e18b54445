use relay_channels::SendError;

/// Errors produced by the LINE Messaging API client.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LINE API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("no channel access token configured")]
    NoToken,
}

impl From<LineError> for SendError {
    fn from(e: LineError) -> Self {
        match e {
            LineError::Api { status, message } => SendError::Rejected { status, message },
            other => SendError::Transport(other.to_string()),
        }
    }
}
