#![allow(unsafe_code)]

//! Symbols instrumented objects link against.
//!
//! Every compilation unit's init routine first registers the address of
//! [`__llvm_profile_runtime`], then each of its data records and its name blob. The process-wide
//! [`ProfileRuntime`] and the output transport live behind one mutex, which serializes those
//! registrations against each other and against the dump.

use core::ffi::{c_int, c_void};

use parking_lot::Mutex;
use profrt_format::{ProfileDataRecord, COUNTER_ENTRY_SIZE};
use profrt_transport::Transport;
use tracing::warn;

use crate::{DataDescriptor, ProcessImage, ProfileRuntime};

/// Ordering marker. Instrumented code references it so the runtime gets linked in, and passes
/// its address to the register hook before any real record.
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static __llvm_profile_runtime: c_int = 0;

struct AbiState {
    runtime: ProfileRuntime,
    transport: Box<dyn Transport + Send>,
}

impl AbiState {
    fn new() -> Self {
        Self {
            runtime: ProfileRuntime::default().with_sentinel(sentinel_addr()),
            transport: default_transport(),
        }
    }
}

static STATE: Mutex<Option<AbiState>> = parking_lot::const_mutex(None);

fn sentinel_addr() -> u64 {
    core::ptr::addr_of!(__llvm_profile_runtime) as usize as u64
}

#[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
fn default_transport() -> Box<dyn Transport + Send> {
    Box::new(profrt_transport::SemihostTransport::new(
        profrt_transport::TrapHost,
    ))
}

#[cfg(not(any(target_arch = "arm", target_arch = "aarch64")))]
fn default_transport() -> Box<dyn Transport + Send> {
    Box::new(profrt_transport::FsTransport::current_dir())
}

fn with_state<R>(f: impl FnOnce(&mut AbiState) -> R) -> R {
    let mut guard = STATE.lock();
    f(guard.get_or_insert_with(AbiState::new))
}

/// Replace the output transport and return the previous one.
pub fn install_transport(transport: Box<dyn Transport + Send>) -> Box<dyn Transport + Send> {
    with_state(|state| core::mem::replace(&mut state.transport, transport))
}

/// Inspect the process-wide runtime.
pub fn with_runtime<R>(f: impl FnOnce(&ProfileRuntime) -> R) -> R {
    with_state(|state| f(&state.runtime))
}

/// Forget every registration and disarm the gate. The installed transport is kept.
pub fn reset() {
    with_state(|state| state.runtime.reset());
}

/// # Safety
///
/// `data` is null, the address of [`__llvm_profile_runtime`], or points to a data record that
/// stays readable for the rest of the process.
#[no_mangle]
pub unsafe extern "C" fn __llvm_profile_register_function(data: *const c_void) {
    if data.is_null() {
        return;
    }
    let addr = data as usize as u64;
    with_state(|state| {
        state.runtime.register_data_with(addr, || {
            // SAFETY: not the sentinel, so this is a live record per the caller's contract.
            DataDescriptor::of(unsafe { &*data.cast::<ProfileDataRecord>() })
        });
    });
}

/// # Safety
///
/// `[names, names + len)` stays readable for the rest of the process.
#[no_mangle]
pub unsafe extern "C" fn __llvm_profile_register_names_function(names: *const c_void, len: u64) {
    let start = names as usize as u64;
    with_state(|state| state.runtime.register_names(start, len));
}

#[no_mangle]
pub extern "C" fn __llvm_profile_counter_entry_size() -> usize {
    COUNTER_ENTRY_SIZE as usize
}

#[no_mangle]
pub extern "C" fn __llvm_profile_initialize_file() {}

/// Dump now. Returns 0 on success and -1 on failure.
#[no_mangle]
pub extern "C" fn __llvm_profile_write_file() -> c_int {
    with_state(|state| {
        // SAFETY: every registered range came through the register hooks above.
        let image = unsafe { ProcessImage::new() };
        match state.runtime.write_file(&mut state.transport, &image) {
            Ok(_) => 0,
            Err(err) => {
                warn!("__llvm_profile_write_file: {err}");
                -1
            }
        }
    })
}

/// Host shutdown hook: dump once if anything registered. Returns -1 only if that dump failed.
#[no_mangle]
pub extern "C" fn profrt_shutdown() -> c_int {
    with_state(|state| {
        // SAFETY: as in `__llvm_profile_write_file`.
        let image = unsafe { ProcessImage::new() };
        match state.runtime.shutdown(&mut state.transport, &image) {
            Some(Err(_)) => -1,
            _ => 0,
        }
    })
}
