pub const HEADER_WORDS: usize = 14;
pub const HEADER_SIZE: usize = HEADER_WORDS * 8;

/// Raw profile header, field order as it appears on the wire.
///
/// Encoded field-by-field by [`RawFileHeader::encode`]; the in-memory layout of this struct is
/// never written directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawFileHeader {
    pub magic: u64,
    pub version: u64,
    pub binary_ids_size: u64,
    pub num_data: u64,
    pub padding_bytes_before_counters: u64,
    pub num_counters: u64,
    pub padding_bytes_after_counters: u64,
    pub num_bitmap_bytes: u64,
    pub padding_bytes_after_bitmap_bytes: u64,
    pub names_size: u64,
    pub counters_delta: u64,
    pub bitmap_delta: u64,
    pub names_delta: u64,
    pub value_kind_last: u64,
}

impl RawFileHeader {
    pub fn words(&self) -> [u64; HEADER_WORDS] {
        [
            self.magic,
            self.version,
            self.binary_ids_size,
            self.num_data,
            self.padding_bytes_before_counters,
            self.num_counters,
            self.padding_bytes_after_counters,
            self.num_bitmap_bytes,
            self.padding_bytes_after_bitmap_bytes,
            self.names_size,
            self.counters_delta,
            self.bitmap_delta,
            self.names_delta,
            self.value_kind_last,
        ]
    }

    /// Serialize in native byte order, matching the record and counter bytes that follow it.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        for (chunk, word) in out.chunks_exact_mut(8).zip(self.words()) {
            chunk.copy_from_slice(&word.to_ne_bytes());
        }
        out
    }

    /// `counters_delta` reinterpreted as the signed offset it encodes.
    pub fn counters_offset(&self) -> i64 {
        self.counters_delta as i64
    }
}
