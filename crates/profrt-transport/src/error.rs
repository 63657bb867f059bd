use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("failed to open {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("short write in segment {segment}: transferred {transferred} of {requested} bytes")]
    ShortWrite {
        segment: usize,
        requested: usize,
        transferred: usize,
    },
}
