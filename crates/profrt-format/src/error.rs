use thiserror::Error;

pub type Result<T> = std::result::Result<T, FormatError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("integer overflow while computing {0} size")]
    Overflow(&'static str),

    #[error("record size must be a non-zero multiple of 8 (got {0})")]
    InvalidRecordSize(u64),
}
