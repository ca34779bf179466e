use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid archive endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to initialize archive runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("archive request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("archive rejected upload with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}
