#![allow(dead_code)]

use std::sync::Once;

use anyhow::{bail, ensure, Context, Result};
use profrt::format::{
    AddressWidth, ProfileDataRecord, RawFileHeader, COUNTER_ENTRY_SIZE, HEADER_SIZE, HEADER_WORDS,
    RECORD_SIZE,
};
use profrt::{DataDescriptor, ProfileRuntime, SyntheticImage};

pub const FILE: &str = "default.profraw";

/// Route `tracing` output through the test harness so it shows up for failing tests only.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// A raw profile decoded back into its sections. Only the native width is understood.
#[derive(Debug)]
pub struct RawProfile {
    pub header: RawFileHeader,
    pub records: Vec<ProfileDataRecord>,
    pub counters: Vec<u64>,
    pub names: Vec<u8>,
    pub trailing_padding: Vec<u8>,
}

impl RawProfile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        ensure!(bytes.len() >= HEADER_SIZE, "file shorter than the header");
        let words: Vec<u64> = bytes[..HEADER_SIZE]
            .chunks_exact(8)
            .map(|w| u64::from_ne_bytes(w.try_into().unwrap()))
            .collect();
        assert_eq!(words.len(), HEADER_WORDS);

        let header = RawFileHeader {
            magic: words[0],
            version: words[1],
            binary_ids_size: words[2],
            num_data: words[3],
            padding_bytes_before_counters: words[4],
            num_counters: words[5],
            padding_bytes_after_counters: words[6],
            num_bitmap_bytes: words[7],
            padding_bytes_after_bitmap_bytes: words[8],
            names_size: words[9],
            counters_delta: words[10],
            bitmap_delta: words[11],
            names_delta: words[12],
            value_kind_last: words[13],
        };
        if header.magic != AddressWidth::native().magic() {
            bail!("unexpected magic {:#018x}", header.magic);
        }

        let mut cursor = HEADER_SIZE + header.binary_ids_size as usize;
        let mut take = |len: u64, what: &str| -> Result<&[u8]> {
            let end = cursor
                .checked_add(len as usize)
                .filter(|end| *end <= bytes.len())
                .with_context(|| format!("{what} runs past the end of the file"))?;
            let section = &bytes[cursor..end];
            cursor = end;
            Ok(section)
        };

        let records = take(header.num_data * RECORD_SIZE as u64, "data")?
            .chunks_exact(RECORD_SIZE)
            .map(bytemuck::pod_read_unaligned::<ProfileDataRecord>)
            .collect();
        take(header.padding_bytes_before_counters, "padding before counters")?;
        let counters = take(header.num_counters * COUNTER_ENTRY_SIZE, "counters")?
            .chunks_exact(8)
            .map(|w| u64::from_ne_bytes(w.try_into().unwrap()))
            .collect();
        take(header.padding_bytes_after_counters, "padding after counters")?;
        take(header.num_bitmap_bytes, "bitmap")?;
        take(header.padding_bytes_after_bitmap_bytes, "padding after bitmap")?;
        let names = take(header.names_size, "names")?.to_vec();
        let trailing_padding = bytes[cursor..].to_vec();

        Ok(Self {
            header,
            records,
            counters,
            names,
            trailing_padding,
        })
    }

    /// Counter values of record `idx`, located the way a reader does: through the record's
    /// relative counter pointer and the header's counters delta.
    pub fn counters_of(&self, idx: usize) -> &[u64] {
        let record = &self.records[idx];
        let record_off = (idx * RECORD_SIZE) as i64;
        let first = (record_off + record.counter_offset() as i64 - self.header.counters_offset())
            / COUNTER_ENTRY_SIZE as i64;
        let first = first as usize;
        &self.counters[first..first + record.num_counters as usize]
    }
}

/// One synthetic instrumented function.
#[derive(Debug, Clone)]
pub struct Function {
    pub name_ref: u64,
    pub hash: u64,
    pub counters: Vec<u64>,
}

/// Place `functions` in a synthetic image: records back to back at `data`, counters back to
/// back at `counters`, and `names` at `names_addr`. Registers every record in order, then the
/// name blob.
pub fn instrument(
    runtime: &mut ProfileRuntime,
    image: &mut SyntheticImage,
    data: u64,
    counters: u64,
    functions: &[Function],
    names_addr: u64,
    names: &[u8],
) -> Vec<DataDescriptor> {
    let mut descriptors = Vec::new();
    let mut counter_addr = counters;
    for (idx, function) in functions.iter().enumerate() {
        let addr = data + (idx * RECORD_SIZE) as u64;
        let counter_offset = counter_addr as i64 - addr as i64;
        let record = ProfileDataRecord::new(
            function.name_ref,
            function.hash,
            counter_offset as isize,
            function.counters.len() as u32,
        );
        image
            .write_record(addr, &record)
            .write_counters(counter_addr, &function.counters);
        descriptors.push(DataDescriptor {
            addr,
            counter_offset,
            num_counters: record.num_counters,
        });
        counter_addr += function.counters.len() as u64 * COUNTER_ENTRY_SIZE;
    }

    for desc in &descriptors {
        runtime.register_data(*desc);
    }
    if !names.is_empty() {
        image.write(names_addr, names);
        runtime.register_names(names_addr, names.len() as u64);
    }
    descriptors
}
