use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never produced a response. The source chain is kept
    /// intact so transport failures can be classified by the caller.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response did not carry a workflow id")]
    MissingWorkflowId,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
