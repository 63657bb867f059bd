#![forbid(unsafe_code)]

//! Wire layout of the raw instrumentation profile (`.profraw`, format version 9).
//!
//! The file is a fixed header of 64-bit words followed by the body sections, each copied
//! verbatim from the instrumented process:
//!
//! ```text
//! header | data records | counters | bitmap bytes | names | zero padding to 8 bytes
//! ```
//!
//! Offsets in the header are deltas relative to the data section (names is absolute) so a
//! reader can relocate the sections without the writer's pointers. Only the bitmap-capable
//! version 9 layout is produced; this crate has no reader.

mod error;
mod header;
mod layout;
mod record;

pub use crate::error::{FormatError, Result};
pub use crate::header::{RawFileHeader, HEADER_SIZE, HEADER_WORDS};
pub use crate::layout::{build_header, padding_to_u64, SectionLayout, SectionStarts};
pub use crate::record::{ProfileDataRecord, ValueKind, RECORD_SIZE, VALUE_KIND_COUNT};

/// Raw format version written into every header.
pub const RAW_VERSION: u64 = 9;

/// Magic for 64-bit producers: `\xFFlprofr\x81`.
pub const RAW_MAGIC_64: u64 = (255u64 << 56)
    | ((b'l' as u64) << 48)
    | ((b'p' as u64) << 40)
    | ((b'r' as u64) << 32)
    | ((b'o' as u64) << 24)
    | ((b'f' as u64) << 16)
    | ((b'r' as u64) << 8)
    | 129;

/// Magic for 32-bit producers: `\xFFlprofR\x81`.
pub const RAW_MAGIC_32: u64 = (255u64 << 56)
    | ((b'l' as u64) << 48)
    | ((b'p' as u64) << 40)
    | ((b'r' as u64) << 32)
    | ((b'o' as u64) << 24)
    | ((b'f' as u64) << 16)
    | ((b'R' as u64) << 8)
    | 129;

/// Size of one counter entry in bytes.
pub const COUNTER_ENTRY_SIZE: u64 = 8;

/// Output file name used by the runtime. There is no override.
pub const DEFAULT_FILE_NAME: &str = "default.profraw";

/// Native address width of the producing process.
///
/// Selects the header magic and the in-memory size of a [`ProfileDataRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressWidth {
    Bits32,
    Bits64,
}

impl AddressWidth {
    pub const fn native() -> Self {
        if core::mem::size_of::<usize>() == 8 {
            AddressWidth::Bits64
        } else {
            AddressWidth::Bits32
        }
    }

    pub const fn magic(self) -> u64 {
        match self {
            AddressWidth::Bits32 => RAW_MAGIC_32,
            AddressWidth::Bits64 => RAW_MAGIC_64,
        }
    }

    pub const fn pointer_size(self) -> u64 {
        match self {
            AddressWidth::Bits32 => 4,
            AddressWidth::Bits64 => 8,
        }
    }

    /// Size of one data record for a producer of this width.
    ///
    /// Two u64 identity words, four pointer-width words, then 16 bytes of counts and padding.
    pub const fn record_size(self) -> u64 {
        16 + 4 * self.pointer_size() + 16
    }
}

impl Default for AddressWidth {
    fn default() -> Self {
        AddressWidth::native()
    }
}
