use profrt_format::{AddressWidth, FormatError};
use profrt_transport::TransportError;
use thiserror::Error;

use crate::Section;

pub type Result<T> = std::result::Result<T, ProfileError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("{section} section [{start:#x}, +{len:#x}) is not readable")]
    SectionUnavailable { section: Section, start: u64, len: u64 },

    #[error("{width:?} output needs a synthetic image; live records use the native layout")]
    WidthMismatch { width: AddressWidth },
}
