use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Result, Transport, TransportError, TransportHandle};

#[derive(Debug, Default)]
struct MemState {
    files: BTreeMap<String, Vec<u8>>,
    handles: Vec<Option<String>>,
    open_calls: usize,
    write_lens: Vec<usize>,
    close_calls: usize,
    fail_open: bool,
    short_write_at: Option<usize>,
}

/// In-memory transport.
///
/// Clones share the same files and call counters, so a test can hand one clone to the runtime
/// and inspect the other afterwards. Fault injection:
/// - [`MemTransport::with_open_failure`]: every `open` fails
/// - [`MemTransport::with_short_write_at`]: the write call with that zero-based index transfers
///   only half of its buffer
#[derive(Debug, Clone, Default)]
pub struct MemTransport {
    state: Arc<Mutex<MemState>>,
}

impl MemTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_open_failure(self) -> Self {
        self.state.lock().fail_open = true;
        self
    }

    pub fn with_short_write_at(self, call: usize) -> Self {
        self.state.lock().short_write_at = Some(call);
        self
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(name).cloned()
    }

    pub fn open_calls(&self) -> usize {
        self.state.lock().open_calls
    }

    pub fn write_calls(&self) -> usize {
        self.state.lock().write_lens.len()
    }

    /// Requested length of every write call, in call order.
    pub fn write_lens(&self) -> Vec<usize> {
        self.state.lock().write_lens.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    /// Number of handles opened and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.state.lock().handles.iter().flatten().count()
    }
}

impl Transport for MemTransport {
    fn name(&self) -> &'static str {
        "mem"
    }

    fn open(&mut self, path: &str) -> Result<TransportHandle> {
        let mut state = self.state.lock();
        state.open_calls += 1;
        if state.fail_open {
            return Err(TransportError::Open {
                path: path.to_string(),
                reason: "injected open failure".to_string(),
            });
        }
        state.files.insert(path.to_string(), Vec::new());
        state.handles.push(Some(path.to_string()));
        Ok(TransportHandle(state.handles.len() - 1))
    }

    fn write(&mut self, handle: TransportHandle, buf: &[u8]) -> usize {
        let mut state = self.state.lock();
        let call = state.write_lens.len();
        state.write_lens.push(buf.len());

        let Some(Some(path)) = state.handles.get(handle.0).cloned() else {
            return 0;
        };
        let len = if state.short_write_at == Some(call) {
            buf.len() / 2
        } else {
            buf.len()
        };
        if let Some(file) = state.files.get_mut(&path) {
            file.extend_from_slice(&buf[..len]);
        }
        len
    }

    fn close(&mut self, handle: TransportHandle) {
        let mut state = self.state.lock();
        state.close_calls += 1;
        if let Some(slot) = state.handles.get_mut(handle.0) {
            *slot = None;
        }
    }
}
