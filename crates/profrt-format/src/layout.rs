use crate::{
    AddressWidth, FormatError, RawFileHeader, Result, ValueKind, COUNTER_ENTRY_SIZE, HEADER_SIZE,
    RAW_VERSION,
};

/// Zero bytes needed after `len` bytes to reach the next 8-byte boundary.
pub fn padding_to_u64(len: u64) -> u64 {
    (8 - len % 8) % 8
}

/// Element counts and byte sizes of every body section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionLayout {
    pub record_size: u64,
    pub num_data: u64,
    pub num_counters: u64,
    pub num_bitmap_bytes: u64,
    pub padding_after_bitmap: u64,
    pub names_size: u64,
    pub padding_after_names: u64,
}

impl SectionLayout {
    /// Derive counts from the byte spans of the data, counter and name ranges.
    ///
    /// Record and counter counts round up, so a partial trailing element still counts.
    /// The bitmap section is always empty in this layout.
    pub fn compute(
        record_size: u64,
        data_span: u64,
        counters_span: u64,
        names_span: u64,
    ) -> Result<Self> {
        if record_size == 0 || record_size % 8 != 0 {
            return Err(FormatError::InvalidRecordSize(record_size));
        }

        let layout = Self {
            record_size,
            num_data: data_span.div_ceil(record_size),
            num_counters: counters_span.div_ceil(COUNTER_ENTRY_SIZE),
            num_bitmap_bytes: 0,
            padding_after_bitmap: 0,
            names_size: names_span,
            padding_after_names: padding_to_u64(names_span),
        };
        // Surface overflow here rather than in the accessors.
        layout.total_len()?;
        Ok(layout)
    }

    pub fn data_bytes(&self) -> u64 {
        self.num_data * self.record_size
    }

    pub fn counters_bytes(&self) -> u64 {
        self.num_counters * COUNTER_ENTRY_SIZE
    }

    /// Bytes emitted for the whole file, header included.
    pub fn total_len(&self) -> Result<u64> {
        let data = self
            .num_data
            .checked_mul(self.record_size)
            .ok_or(FormatError::Overflow("data"))?;
        let counters = self
            .num_counters
            .checked_mul(COUNTER_ENTRY_SIZE)
            .ok_or(FormatError::Overflow("counters"))?;
        [
            data,
            counters,
            self.num_bitmap_bytes,
            self.padding_after_bitmap,
            self.names_size,
            self.padding_after_names,
        ]
        .into_iter()
        .try_fold(HEADER_SIZE as u64, |acc, len| acc.checked_add(len))
        .ok_or(FormatError::Overflow("file"))
    }
}

/// Start addresses of the sections in the producing process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionStarts {
    pub data: u64,
    pub counters: u64,
    pub bitmap: u64,
    pub names: u64,
}

pub fn build_header(
    width: AddressWidth,
    layout: &SectionLayout,
    starts: &SectionStarts,
) -> RawFileHeader {
    RawFileHeader {
        magic: width.magic(),
        version: RAW_VERSION,
        binary_ids_size: 0,
        num_data: layout.num_data,
        padding_bytes_before_counters: 0,
        num_counters: layout.num_counters,
        padding_bytes_after_counters: 0,
        num_bitmap_bytes: layout.num_bitmap_bytes,
        padding_bytes_after_bitmap_bytes: layout.padding_after_bitmap,
        names_size: layout.names_size,
        counters_delta: starts.counters.wrapping_sub(starts.data),
        bitmap_delta: starts.bitmap.wrapping_sub(starts.data),
        names_delta: starts.names,
        value_kind_last: ValueKind::LAST as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn padding_rounds_to_next_word() {
        assert_eq!(padding_to_u64(0), 0);
        assert_eq!(padding_to_u64(1), 7);
        assert_eq!(padding_to_u64(8), 0);
        assert_eq!(padding_to_u64(10), 6);
    }

    #[test]
    fn empty_spans_give_header_only_layout() {
        let layout = SectionLayout::compute(64, 0, 0, 0).unwrap();
        assert_eq!(layout.num_data, 0);
        assert_eq!(layout.num_counters, 0);
        assert_eq!(layout.total_len().unwrap(), HEADER_SIZE as u64);
    }

    #[test]
    fn partial_elements_round_up() {
        let layout = SectionLayout::compute(48, 49, 9, 3).unwrap();
        assert_eq!(layout.num_data, 2);
        assert_eq!(layout.num_counters, 2);
        assert_eq!(layout.data_bytes(), 96);
        assert_eq!(layout.counters_bytes(), 16);
    }

    #[test]
    fn rejects_record_sizes_that_break_alignment() {
        assert_eq!(
            SectionLayout::compute(0, 0, 0, 0).unwrap_err(),
            FormatError::InvalidRecordSize(0)
        );
        assert_eq!(
            SectionLayout::compute(44, 0, 0, 0).unwrap_err(),
            FormatError::InvalidRecordSize(44)
        );
    }

    #[test]
    fn huge_spans_report_overflow() {
        let err = SectionLayout::compute(64, u64::MAX, 0, 0).unwrap_err();
        assert!(matches!(err, FormatError::Overflow(_)));
    }

    #[test]
    fn header_deltas_are_relative_to_data_start() {
        let layout = SectionLayout::compute(64, 128, 40, 10).unwrap();
        let starts = SectionStarts {
            data: 0x2000,
            counters: 0x1000,
            bitmap: 0x2000,
            names: 0x3000,
        };
        let header = build_header(AddressWidth::Bits64, &layout, &starts);
        assert_eq!(header.magic, crate::RAW_MAGIC_64);
        assert_eq!(header.version, 9);
        assert_eq!(header.counters_offset(), -0x1000);
        assert_eq!(header.bitmap_delta, 0);
        assert_eq!(header.names_delta, 0x3000);
        assert_eq!(header.value_kind_last, 1);
        assert_eq!(header.num_data, 2);
        assert_eq!(header.num_counters, 5);
        assert_eq!(header.names_size, 10);
    }

    proptest! {
        #[test]
        fn total_len_is_always_word_aligned(
            records in 0u64..64,
            counters in 0u64..4096,
            names in 0u64..4096,
            wide in any::<bool>(),
        ) {
            let width = if wide { AddressWidth::Bits64 } else { AddressWidth::Bits32 };
            let record_size = width.record_size();
            let layout = SectionLayout::compute(record_size, records * record_size, counters, names)
                .unwrap();
            prop_assert_eq!(layout.total_len().unwrap() % 8, 0);
        }
    }
}
