use std::collections::BTreeMap;

use profrt_format::ProfileDataRecord;

/// Source of the bytes behind registered address ranges.
pub trait MemoryImage {
    /// Bytes of `[start, start + len)`, or `None` if any part of the range is not backed.
    fn read(&self, start: u64, len: u64) -> Option<&[u8]>;

    /// Whether the bytes are this process's own memory, laid out for the native address width.
    fn is_live(&self) -> bool {
        false
    }
}

impl<M: MemoryImage + ?Sized> MemoryImage for &M {
    fn read(&self, start: u64, len: u64) -> Option<&[u8]> {
        (**self).read(start, len)
    }

    fn is_live(&self) -> bool {
        (**self).is_live()
    }
}

/// Sparse memory at synthetic addresses.
///
/// Writes that overlap or touch an existing region are coalesced into it, so a range spanning
/// several adjacent writes reads back as one slice. Gaps are never filled in.
#[derive(Debug, Default, Clone)]
pub struct SyntheticImage {
    regions: BTreeMap<u64, Vec<u8>>,
}

impl SyntheticImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, addr: u64, bytes: &[u8]) -> &mut Self {
        let end = addr + bytes.len() as u64;

        let touching: Vec<u64> = self
            .regions
            .range(..=end)
            .filter(|(base, region)| **base + region.len() as u64 >= addr)
            .map(|(base, _)| *base)
            .collect();

        let mut start = addr;
        let mut merged_end = end;
        for base in &touching {
            start = start.min(*base);
            merged_end = merged_end.max(*base + self.regions[base].len() as u64);
        }

        let mut merged = vec![0u8; (merged_end - start) as usize];
        for base in touching {
            if let Some(region) = self.regions.remove(&base) {
                let off = (base - start) as usize;
                merged[off..off + region.len()].copy_from_slice(&region);
            }
        }
        let off = (addr - start) as usize;
        merged[off..off + bytes.len()].copy_from_slice(bytes);
        self.regions.insert(start, merged);
        self
    }

    pub fn write_record(&mut self, addr: u64, record: &ProfileDataRecord) -> &mut Self {
        self.write(addr, record.as_bytes())
    }

    /// Counter values in native byte order, as instrumented code stores them.
    pub fn write_counters(&mut self, addr: u64, counters: &[u64]) -> &mut Self {
        let bytes: Vec<u8> = counters.iter().flat_map(|c| c.to_ne_bytes()).collect();
        self.write(addr, &bytes)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

impl MemoryImage for SyntheticImage {
    fn read(&self, start: u64, len: u64) -> Option<&[u8]> {
        if len == 0 {
            return Some(&[]);
        }
        let (base, region) = self.regions.range(..=start).next_back()?;
        let off = usize::try_from(start - base).ok()?;
        let end = off.checked_add(usize::try_from(len).ok()?)?;
        region.get(off..end)
    }
}

/// The live memory of the current process.
#[derive(Debug)]
pub struct ProcessImage {
    _private: (),
}

impl ProcessImage {
    /// # Safety
    ///
    /// Every range passed to [`MemoryImage::read`] must be mapped and readable for as long as the
    /// returned slice is used. Registered ranges satisfy this when they come from instrumented
    /// code, whose records, counters and names live in static storage.
    #[allow(unsafe_code)]
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl MemoryImage for ProcessImage {
    #[allow(unsafe_code)]
    fn read(&self, start: u64, len: u64) -> Option<&[u8]> {
        if len == 0 {
            return Some(&[]);
        }
        let start = usize::try_from(start).ok()?;
        let len = usize::try_from(len).ok()?;
        if start == 0 || start.checked_add(len)? > isize::MAX as usize {
            return None;
        }
        // SAFETY: non-null and in range for a slice; readability is the constructor's contract.
        Some(unsafe { core::slice::from_raw_parts(start as *const u8, len) })
    }

    fn is_live(&self) -> bool {
        true
    }
}
