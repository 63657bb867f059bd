use bytemuck::{Pod, Zeroable};

/// Value-profiling kinds, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ValueKind {
    IndirectCallTarget = 0,
    MemOpSize = 1,
}

impl ValueKind {
    pub const FIRST: ValueKind = ValueKind::IndirectCallTarget;
    pub const LAST: ValueKind = ValueKind::MemOpSize;
}

pub const VALUE_KIND_COUNT: usize = ValueKind::LAST as usize + 1;

/// Per-function descriptor emitted by compiler instrumentation.
///
/// Lives in static storage of the instrumented program. The runtime only ever reads
/// `counter_ptr` and `num_counters`; the rest is copied to the file as opaque bytes.
///
/// `counter_ptr` holds the offset of the function's counters relative to the address of the
/// record itself, so the counter base is `record_addr + counter_ptr` (wrapping).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ProfileDataRecord {
    pub name_ref: u64,
    pub func_hash: u64,
    pub counter_ptr: usize,
    pub bitmap_ptr: usize,
    pub function_ptr: usize,
    pub values: usize,
    pub num_counters: u32,
    pub num_value_sites: [u16; VALUE_KIND_COUNT],
    pub num_bitmap_bytes: u32,
    _pad: u32,
}

pub const RECORD_SIZE: usize = core::mem::size_of::<ProfileDataRecord>();

const _: () = assert!(RECORD_SIZE % 8 == 0);

impl ProfileDataRecord {
    pub fn new(name_ref: u64, func_hash: u64, counter_offset: isize, num_counters: u32) -> Self {
        Self {
            name_ref,
            func_hash,
            counter_ptr: counter_offset as usize,
            num_counters,
            ..Self::default()
        }
    }

    /// Signed offset from this record to its first counter.
    pub fn counter_offset(&self) -> isize {
        self.counter_ptr as isize
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
