use thiserror::Error;

#[derive(Error, Debug)]
pub enum JenkinsError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered outside the accepted status set. The message is the
    /// bare decimal code so callers that only see the text can still branch on it.
    #[error("{code}")]
    Status { code: u16 },

    #[error("Build was accepted but the response carries no \"Location\" header")]
    MissingLocation,

    #[error("Cannot extract a queue item from location: {0}")]
    InvalidLocation(String),

    #[error("Will not request new build because {job} is already running")]
    AlreadyRunning { job: String },

    #[error("No pending input action on run {run}")]
    NoPendingInput { run: String },

    /// A run, stage or flow node had no usable `_links.self.href`.
    ///
    /// Bases are derived for the whole graph up front, so a single bad stage
    /// rejects its run, and a run listing fails as a whole.
    #[error("Link does not point into the workflow API: {0}")]
    InvalidLink(String),

    #[error("Missing required value: {0}")]
    MissingField(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl JenkinsError {
    /// Numeric HTTP status for [`JenkinsError::Status`], `None` otherwise.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

pub type Result<T> = std::result::Result<T, JenkinsError>;
