#![deny(unsafe_code)]

//! Runtime half of the raw profile writer.
//!
//! Instrumented compilation units register their data records and name blobs once at startup;
//! [`AddressRangeRegistry`] widens one bounding range per section. At shutdown the host fires
//! the [`FinalizationGate`], which runs [`RawFileSerializer`] exactly once to emit the file
//! through an injected [`Transport`](profrt_transport::Transport).
//!
//! [`ProfileRuntime`] bundles the three for a process. With the `c-abi` feature the [`abi`]
//! module exports the symbols instrumented code calls.

#[cfg(feature = "c-abi")]
pub mod abi;
mod error;
mod gate;
mod image;
mod registry;
mod runtime;
mod serializer;

pub use crate::error::{ProfileError, Result};
pub use crate::gate::FinalizationGate;
pub use crate::image::{MemoryImage, ProcessImage, SyntheticImage};
pub use crate::registry::{
    AddressRangeRegistry, DataDescriptor, Registration, Section, SectionRange, SectionRanges,
};
pub use crate::runtime::ProfileRuntime;
pub use crate::serializer::{
    DumpOptions, DumpSummary, RawFilePlan, RawFileSerializer, SerializerState,
};

#[cfg(test)]
mod proptests;
