use thiserror::Error;

/// Closed set of failure kinds shared by every lookup capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Missing or placeholder credentials, or an operation the configuration forbids.
    #[error("{message}")]
    Config { message: String },

    /// The lookup succeeded but there was nothing to return.
    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Transport { message: String },

    #[error("{message}")]
    Parse { message: String },
}

impl LookupError {
    pub fn config(message: impl Into<String>) -> Self {
        LookupError::Config { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        LookupError::NotFound { message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        LookupError::Transport { message: message.into() }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        LookupError::Parse { message: message.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::Config { .. } => "config",
            LookupError::NotFound { .. } => "not_found",
            LookupError::Transport { .. } => "transport",
            LookupError::Parse { .. } => "parse",
        }
    }

    /// Render for a capability boundary.
    ///
    /// Configuration and not-found messages are already user-facing; transport
    /// and parse failures get the capability's context label in front.
    pub fn render(&self, context: &str) -> String {
        match self {
            LookupError::Config { message } | LookupError::NotFound { message } => {
                message.clone()
            }
            LookupError::Transport { message } | LookupError::Parse { message } => {
                format!("{}: {}", context, message)
            }
        }
    }

    /// Map a reqwest failure into the closed kinds.
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return LookupError::transport(format!("request timed out: {}", error));
        }
        if error.is_decode() {
            return LookupError::parse(format!("failed to decode response: {}", error));
        }
        if error.is_status() {
            return LookupError::transport(error.to_string());
        }
        if error.is_connect() {
            return LookupError::transport(format!("failed to connect to server: {}", error));
        }
        LookupError::transport(format!("request error: {}", error))
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(error: serde_json::Error) -> Self {
        LookupError::parse(format!("invalid JSON: {}", error))
    }
}
