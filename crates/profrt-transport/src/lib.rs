#![deny(unsafe_code)]

//! Output transports for the raw profile writer.
//!
//! A [`Transport`] is the minimal open/write/close contract the host environment supplies.
//! [`TransportWriter`] drives an ordered list of [`WriteSegment`]s through any transport and
//! stops on the first short transfer.
//!
//! Provided transports:
//! - [`SemihostTransport`]: Arm semihosting calls (`SYS_OPEN`/`SYS_WRITE`/`SYS_CLOSE`) issued
//!   through a [`SemihostHost`]; [`TrapHost`] is the real trap on `arm`/`aarch64`
//! - [`FsTransport`]: plain files under a directory
//! - [`MemTransport`]: in-memory files with call accounting and fault injection

mod error;
mod fs;
mod mem;
pub mod semihost;
mod writer;

pub use crate::error::{Result, TransportError};
pub use crate::fs::FsTransport;
pub use crate::mem::MemTransport;
#[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
pub use crate::semihost::TrapHost;
pub use crate::semihost::{SemihostHost, SemihostTransport};
pub use crate::writer::{TransportWriter, VectoredWriter, WriteSegment, ZERO_CHUNK_LEN};

/// Opaque handle returned by [`Transport::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportHandle(pub usize);

/// Synchronous open/write/close sink.
///
/// Calls block until the underlying mechanism returns; there is no timeout or cancellation.
pub trait Transport {
    /// Short transport name for diagnostics.
    fn name(&self) -> &'static str;

    fn open(&mut self, path: &str) -> Result<TransportHandle>;

    /// Write `buf` and return how many bytes were transferred.
    ///
    /// Anything less than `buf.len()` is a failure; the caller does not retry.
    fn write(&mut self, handle: TransportHandle, buf: &[u8]) -> usize;

    /// Best-effort close. Errors are swallowed.
    fn close(&mut self, handle: TransportHandle);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open(&mut self, path: &str) -> Result<TransportHandle> {
        (**self).open(path)
    }

    fn write(&mut self, handle: TransportHandle, buf: &[u8]) -> usize {
        (**self).write(handle, buf)
    }

    fn close(&mut self, handle: TransportHandle) {
        (**self).close(handle)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open(&mut self, path: &str) -> Result<TransportHandle> {
        (**self).open(path)
    }

    fn write(&mut self, handle: TransportHandle, buf: &[u8]) -> usize {
        (**self).write(handle, buf)
    }

    fn close(&mut self, handle: TransportHandle) {
        (**self).close(handle)
    }
}
