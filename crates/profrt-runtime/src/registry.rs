use core::fmt;

use profrt_format::{ProfileDataRecord, COUNTER_ENTRY_SIZE, RECORD_SIZE};
use tracing::debug;

/// Instrumentation section tracked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Data,
    Counters,
    Names,
}

impl Section {
    pub fn name(self) -> &'static str {
        match self {
            Section::Data => "data",
            Section::Counters => "counters",
            Section::Names => "names",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A half-open address range `[start, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SectionRange {
    pub start: u64,
    pub end: u64,
}

impl SectionRange {
    pub const EMPTY: SectionRange = SectionRange { start: 0, end: 0 };

    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// `[start, start + len)`, clamped at the top of the address space.
    pub fn from_len(start: u64, len: u64) -> Self {
        Self {
            start,
            end: start.saturating_add(len),
        }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Smallest range covering both `self` and `other`.
    pub fn widen(self, other: SectionRange) -> SectionRange {
        SectionRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// What `register_data` needs to know about one data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    /// Address of the record itself.
    pub addr: u64,
    /// Offset from `addr` to the record's first counter.
    pub counter_offset: i64,
    pub num_counters: u32,
}

impl DataDescriptor {
    /// Describe a record living in this process.
    pub fn of(record: &ProfileDataRecord) -> Self {
        Self {
            addr: record as *const ProfileDataRecord as usize as u64,
            counter_offset: record.counter_offset() as i64,
            num_counters: record.num_counters,
        }
    }

    pub fn counter_base(&self) -> u64 {
        self.addr.wrapping_add_signed(self.counter_offset)
    }

    pub fn counters(&self) -> SectionRange {
        SectionRange::from_len(
            self.counter_base(),
            u64::from(self.num_counters) * COUNTER_ENTRY_SIZE,
        )
    }
}

/// Outcome of a data registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Recorded,
    /// The descriptor was the calling convention's ordering marker, not a record.
    SkippedSentinel,
}

/// Snapshot of the three section ranges. Unseeded sections read as [`SectionRange::EMPTY`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionRanges {
    pub data: SectionRange,
    pub counters: SectionRange,
    pub names: SectionRange,
}

impl SectionRanges {
    pub fn get(&self, section: Section) -> SectionRange {
        match section {
            Section::Data => self.data,
            Section::Counters => self.counters,
            Section::Names => self.names,
        }
    }
}

/// Bounding ranges of every registered data record, counter block and name blob.
///
/// Registrations only ever widen a range, so the result does not depend on call order. There is
/// no removal. Widening is a plain read-modify-write: concurrent registrations must be
/// serialized by the caller.
#[derive(Debug, Clone)]
pub struct AddressRangeRegistry {
    record_size: u64,
    sentinel: Option<u64>,
    data: Option<SectionRange>,
    counters: Option<SectionRange>,
    names: Option<SectionRange>,
    registered: usize,
}

impl Default for AddressRangeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressRangeRegistry {
    /// Registry for records of this process's native layout.
    pub fn new() -> Self {
        Self::with_record_size(RECORD_SIZE as u64)
    }

    pub fn with_record_size(record_size: u64) -> Self {
        Self {
            record_size,
            sentinel: None,
            data: None,
            counters: None,
            names: None,
            registered: 0,
        }
    }

    /// Treat `addr` as the ordering marker that must never be interpreted as a record.
    pub fn with_sentinel(mut self, addr: u64) -> Self {
        self.sentinel = Some(addr);
        self
    }

    pub fn record_size(&self) -> u64 {
        self.record_size
    }

    pub fn is_sentinel(&self, addr: u64) -> bool {
        self.sentinel == Some(addr)
    }

    pub fn register_data(&mut self, desc: DataDescriptor) -> Registration {
        if self.is_sentinel(desc.addr) {
            debug!(addr = desc.addr, "skipping runtime sentinel registration");
            return Registration::SkippedSentinel;
        }

        let counters = desc.counters();
        debug!(
            addr = desc.addr,
            counters = desc.num_counters,
            counter_base = counters.start,
            "register data record"
        );
        widen(
            &mut self.data,
            SectionRange::from_len(desc.addr, self.record_size),
        );
        widen(&mut self.counters, counters);
        self.registered += 1;
        Registration::Recorded
    }

    pub fn register_names(&mut self, start: u64, len: u64) {
        debug!(start, len, "register names");
        widen(&mut self.names, SectionRange::from_len(start, len));
    }

    pub fn ranges(&self) -> SectionRanges {
        SectionRanges {
            data: self.data.unwrap_or(SectionRange::EMPTY),
            counters: self.counters.unwrap_or(SectionRange::EMPTY),
            names: self.names.unwrap_or(SectionRange::EMPTY),
        }
    }

    /// Number of data records registered, sentinel excluded.
    pub fn registered(&self) -> usize {
        self.registered
    }

    /// Forget every registration; the record size and sentinel are kept.
    pub fn reset(&mut self) {
        self.data = None;
        self.counters = None;
        self.names = None;
        self.registered = 0;
    }
}

fn widen(slot: &mut Option<SectionRange>, range: SectionRange) {
    *slot = Some(match *slot {
        Some(current) => current.widen(range),
        None => range,
    });
}
