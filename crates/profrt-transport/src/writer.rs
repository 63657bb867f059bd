use tracing::warn;

use crate::{Result, Transport, TransportError, TransportHandle};

/// Largest single write issued for a zero-fill segment.
pub const ZERO_CHUNK_LEN: usize = 8;

static ZEROES: [u8; ZERO_CHUNK_LEN] = [0; ZERO_CHUNK_LEN];

/// One unit of output: borrowed bytes, or a run of zeros that is never materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSegment<'a> {
    Bytes(&'a [u8]),
    Zeros(usize),
}

impl WriteSegment<'_> {
    pub fn len(&self) -> usize {
        match self {
            WriteSegment::Bytes(bytes) => bytes.len(),
            WriteSegment::Zeros(len) => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered segment output.
///
/// Segments are transferred strictly in order. The first short transfer fails the call and no
/// later segment is attempted; bytes already transferred stay where they landed.
pub trait VectoredWriter {
    fn write_segments(&mut self, segments: &[WriteSegment<'_>]) -> Result<()>;
}

/// [`VectoredWriter`] over an already opened [`Transport`] handle.
///
/// Segment indices in [`TransportError::ShortWrite`] count every segment passed to this writer
/// across calls. Empty segments consume an index but issue no transport call.
pub struct TransportWriter<'t, T: ?Sized> {
    transport: &'t mut T,
    handle: TransportHandle,
    segments_written: usize,
    bytes_written: u64,
}

impl<'t, T: Transport + ?Sized> TransportWriter<'t, T> {
    pub fn new(transport: &'t mut T, handle: TransportHandle) -> Self {
        Self {
            transport,
            handle,
            segments_written: 0,
            bytes_written: 0,
        }
    }

    pub fn handle(&self) -> TransportHandle {
        self.handle
    }

    /// Bytes the transport reported as transferred, including a failing partial transfer.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn segments_written(&self) -> usize {
        self.segments_written
    }

    fn transfer(&mut self, segment: usize, buf: &[u8]) -> Result<()> {
        let transferred = self.transport.write(self.handle, buf).min(buf.len());
        self.bytes_written += transferred as u64;
        if transferred < buf.len() {
            warn!(
                transport = self.transport.name(),
                segment,
                requested = buf.len(),
                transferred,
                "short write"
            );
            return Err(TransportError::ShortWrite {
                segment,
                requested: buf.len(),
                transferred,
            });
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> VectoredWriter for TransportWriter<'_, T> {
    fn write_segments(&mut self, segments: &[WriteSegment<'_>]) -> Result<()> {
        for segment in segments {
            let idx = self.segments_written;
            match *segment {
                WriteSegment::Bytes(bytes) => {
                    if !bytes.is_empty() {
                        self.transfer(idx, bytes)?;
                    }
                }
                WriteSegment::Zeros(mut remaining) => {
                    while remaining > 0 {
                        let chunk = remaining.min(ZERO_CHUNK_LEN);
                        self.transfer(idx, &ZEROES[..chunk])?;
                        remaining -= chunk;
                    }
                }
            }
            self.segments_written += 1;
        }
        Ok(())
    }
}
