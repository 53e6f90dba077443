use thiserror::Error;

#[derive(Debug, Error)]
pub enum SharewardenError {
    #[error("unknown response: {0}")]
    UnknownResponse(String),
    #[error("io error: {0}")]
    Io(String),
}
