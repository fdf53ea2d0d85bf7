use thiserror::Error;

#[derive(Error, Debug)]
pub enum PkgScoreError {
    #[error("could not resolve a GitHub repository for {input}: {reason}")]
    ResolutionFailed { input: String, reason: String },

    #[error("required signal `{0}` is missing")]
    MissingSignal(String),

    #[error("request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("malformed payload from {endpoint}: {detail}")]
    MalformedPayload { endpoint: String, detail: String },

    #[error("clone of {url} failed: {reason}")]
    CloneFailed { url: String, reason: String },

    #[error("package record {0} not found")]
    RecordNotFound(i64),

    #[error("no package record for {0}")]
    UnknownPackage(String),

    #[error("{column} already written for {url}")]
    AlreadyWritten { url: String, column: &'static str },

    #[error("{column} not yet written for {url}")]
    Incomplete { url: String, column: &'static str },

    #[error("storage handle is closed")]
    StoreClosed,

    #[error("input file not found: {0}")]
    InputNotFound(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("config parse error: {0}")]
    ConfigParse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl PkgScoreError {
    pub fn resolution(input: &str, reason: impl Into<String>) -> Self {
        Self::ResolutionFailed {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(endpoint: &str, detail: impl Into<String>) -> Self {
        Self::MalformedPayload {
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PkgScoreError>;
