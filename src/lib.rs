//! Raw instrumentation-profile writer for programs without an operating system.
//!
//! Instrumented code registers its per-function data records and name blobs at startup; at
//! shutdown the runtime emits one `default.profraw` file (raw format version 9) through a
//! pluggable [`Transport`]: Arm semihosting on the target, plain files or memory on a host.
//!
//! The pieces live in their own crates and are re-exported here:
//! - [`format`]: header, record layout and section arithmetic
//! - [`transport`]: the open/write/close contract, segment writer and transports
//! - [`runtime`]: registry, finalization gate, serializer and (with `c-abi`) the exported symbols

pub use profrt_format as format;
pub use profrt_runtime as runtime;
pub use profrt_transport as transport;

pub use profrt_format::{AddressWidth, ProfileDataRecord, RawFileHeader, DEFAULT_FILE_NAME};
pub use profrt_runtime::{
    AddressRangeRegistry, DataDescriptor, DumpOptions, DumpSummary, FinalizationGate,
    MemoryImage, ProfileError, ProfileRuntime, RawFileSerializer, SyntheticImage,
};
pub use profrt_transport::{
    FsTransport, MemTransport, SemihostHost, SemihostTransport, Transport, TransportError,
    VectoredWriter, WriteSegment,
};
