#![allow(unsafe_code)]

use core::arch::asm;

use super::{SemihostHost, SemihostRequest};

/// Issues semihosting requests with the architecture's trap instruction.
///
/// Without a debugger or simulator servicing semihosting the trap faults, so this host is only
/// selected on targets that run under one.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrapHost;

impl SemihostHost for TrapHost {
    fn call(&mut self, request: &SemihostRequest<'_>) -> usize {
        let block = request.arg_block();
        // SAFETY: `block` and the buffers it points at are borrowed for the whole call; the
        // host only reads them (SYS_OPEN/SYS_WRITE/SYS_CLOSE never write guest memory).
        unsafe { semihost_trap(request.op(), block.as_ptr() as usize) }
    }
}

#[cfg(target_arch = "aarch64")]
unsafe fn semihost_trap(op: usize, arg: usize) -> usize {
    let mut x0 = op;
    asm!(
        "hlt #0xf000",
        inout("x0") x0,
        in("x1") arg,
        lateout("x2") _,
        lateout("x3") _,
        lateout("x30") _,
        options(nostack),
    );
    x0
}

#[cfg(all(target_arch = "arm", target_feature = "mclass"))]
unsafe fn semihost_trap(op: usize, arg: usize) -> usize {
    let mut r0 = op;
    asm!(
        "bkpt #0xab",
        inout("r0") r0,
        in("r1") arg,
        lateout("r2") _,
        lateout("r3") _,
        lateout("r12") _,
        lateout("lr") _,
        options(nostack),
    );
    r0
}

#[cfg(all(
    target_arch = "arm",
    not(target_feature = "mclass"),
    target_feature = "thumb-mode"
))]
unsafe fn semihost_trap(op: usize, arg: usize) -> usize {
    let mut r0 = op;
    asm!(
        "svc #0xab",
        inout("r0") r0,
        in("r1") arg,
        lateout("r2") _,
        lateout("r3") _,
        lateout("r12") _,
        lateout("lr") _,
        options(nostack),
    );
    r0
}

#[cfg(all(
    target_arch = "arm",
    not(target_feature = "mclass"),
    not(target_feature = "thumb-mode")
))]
unsafe fn semihost_trap(op: usize, arg: usize) -> usize {
    let mut r0 = op;
    asm!(
        "svc #0x123456",
        inout("r0") r0,
        in("r1") arg,
        lateout("r2") _,
        lateout("r3") _,
        lateout("r12") _,
        lateout("lr") _,
        options(nostack),
    );
    r0
}
