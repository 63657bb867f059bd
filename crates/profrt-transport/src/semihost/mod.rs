//! Arm semihosting file calls.
//!
//! Each call passes an operation number and the address of an argument block laid out as three
//! machine words. The block encoding lives in [`SemihostRequest::arg_block`] so it can be checked
//! without a debugger attached; the trap itself is behind [`SemihostHost`].

use std::ffi::{CStr, CString};

use tracing::{debug, warn};

use crate::{Result, Transport, TransportError, TransportHandle};

#[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
mod trap;

#[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
pub use trap::TrapHost;

pub const SYS_OPEN: usize = 0x01;
pub const SYS_CLOSE: usize = 0x02;
pub const SYS_WRITE: usize = 0x05;

pub const OPEN_MODE_R: usize = 0;
pub const OPEN_MODE_W: usize = 4;
pub const OPEN_MODE_A: usize = 8;
pub const OPEN_MODE_B: usize = 1;
pub const OPEN_MODE_PLUS: usize = 2;

/// `fopen` mode `"w+b"`.
pub const OPEN_MODE_W_PLUS_B: usize = OPEN_MODE_W | OPEN_MODE_B | OPEN_MODE_PLUS;

/// Number of machine words in every argument block.
pub const ARG_BLOCK_WORDS: usize = 3;

/// Value returned by `SYS_OPEN` when the host could not open the file.
pub const OPEN_FAILED: usize = usize::MAX;

/// A single semihosting request with the buffers it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemihostRequest<'a> {
    Open { path: &'a CStr, mode: usize },
    Write { handle: usize, data: &'a [u8] },
    Close { handle: usize },
}

impl SemihostRequest<'_> {
    pub fn op(&self) -> usize {
        match self {
            SemihostRequest::Open { .. } => SYS_OPEN,
            SemihostRequest::Write { .. } => SYS_WRITE,
            SemihostRequest::Close { .. } => SYS_CLOSE,
        }
    }

    /// Argument block as the debugger reads it. Unused trailing words are zero.
    pub fn arg_block(&self) -> [usize; ARG_BLOCK_WORDS] {
        match *self {
            // Length excludes the terminating NUL, which must still be present.
            SemihostRequest::Open { path, mode } => {
                [path.as_ptr() as usize, mode, path.to_bytes().len()]
            }
            SemihostRequest::Write { handle, data } => {
                [handle, data.as_ptr() as usize, data.len()]
            }
            SemihostRequest::Close { handle } => [handle, 0, 0],
        }
    }
}

/// Executes semihosting requests and returns the raw result word.
///
/// For `SYS_WRITE` the result is the number of bytes NOT written.
pub trait SemihostHost {
    fn call(&mut self, request: &SemihostRequest<'_>) -> usize;
}

impl<H: SemihostHost + ?Sized> SemihostHost for &mut H {
    fn call(&mut self, request: &SemihostRequest<'_>) -> usize {
        (**self).call(request)
    }
}

/// [`Transport`] over semihosting.
#[derive(Debug, Default)]
pub struct SemihostTransport<H> {
    host: H,
}

impl<H: SemihostHost> SemihostTransport<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }
}

impl<H: SemihostHost> Transport for SemihostTransport<H> {
    fn name(&self) -> &'static str {
        "semihost"
    }

    fn open(&mut self, path: &str) -> Result<TransportHandle> {
        let c_path = CString::new(path).map_err(|_| TransportError::Open {
            path: path.to_string(),
            reason: "path contains a NUL byte".to_string(),
        })?;

        let handle = self.host.call(&SemihostRequest::Open {
            path: &c_path,
            mode: OPEN_MODE_W_PLUS_B,
        });
        if handle == OPEN_FAILED {
            warn!(path, "SYS_OPEN failed");
            return Err(TransportError::Open {
                path: path.to_string(),
                reason: "host returned -1".to_string(),
            });
        }
        debug!(path, handle, "SYS_OPEN");
        Ok(TransportHandle(handle))
    }

    fn write(&mut self, handle: TransportHandle, buf: &[u8]) -> usize {
        let not_written = self.host.call(&SemihostRequest::Write {
            handle: handle.0,
            data: buf,
        });
        buf.len().saturating_sub(not_written)
    }

    fn close(&mut self, handle: TransportHandle) {
        let _ = self.host.call(&SemihostRequest::Close { handle: handle.0 });
    }
}
