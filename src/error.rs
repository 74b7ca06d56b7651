use thiserror::Error;

/// Failure of a single chat exchange with the remote endpoint.
///
/// The `Display` output is the detail shown to developers in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The endpoint answered with a non-2xx status
    #[error("{detail}")]
    Status { code: u16, detail: String },

    /// A 2xx response whose body could not be decoded
    #[error("{0}")]
    Decode(String),

    /// No response arrived at all
    #[error("{0}")]
    Transport(String),
}

impl ChatError {
    pub fn generic_status(code: u16) -> String {
        format!("HTTP error! status: {}", code)
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChatError::Decode(err.to_string())
        } else {
            ChatError::Transport(err.to_string())
        }
    }
}
