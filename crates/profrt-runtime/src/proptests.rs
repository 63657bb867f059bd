use crate::{
    AddressRangeRegistry, DataDescriptor, DumpOptions, ProfileError, RawFileSerializer,
    Registration, SectionRange, SyntheticImage,
};
use profrt_format::{ProfileDataRecord, COUNTER_ENTRY_SIZE, RECORD_SIZE};
use profrt_transport::{MemTransport, TransportError};
use proptest::prelude::*;

const MAX_RECORDS: usize = 16;
const SENTINEL: u64 = 0x8;
const FILE: &str = "default.profraw";

fn descriptor_strategy() -> impl Strategy<Value = DataDescriptor> {
    (0x1000u64..0x10_0000, -0x8000i64..0x8000, 0u32..64).prop_map(
        |(slot, counter_offset, num_counters)| DataDescriptor {
            // Records are word aligned in every real data section.
            addr: slot * 8,
            counter_offset,
            num_counters,
        },
    )
}

fn registrations_strategy() -> impl Strategy<Value = (Vec<DataDescriptor>, Vec<DataDescriptor>)> {
    prop::collection::vec(descriptor_strategy(), 1..MAX_RECORDS)
        .prop_flat_map(|descs| (Just(descs.clone()), Just(descs).prop_shuffle()))
}

fn registry_of(descs: &[DataDescriptor]) -> AddressRangeRegistry {
    let mut registry = AddressRangeRegistry::new().with_sentinel(SENTINEL);
    for desc in descs {
        registry.register_data(*desc);
    }
    registry
}

/// One function whose record, counters and names are all readable.
fn scenario(num_counters: u32, names_len: usize) -> (AddressRangeRegistry, SyntheticImage) {
    let record_addr = 0x4000u64;
    let counter_offset = 0x1000i64;
    let counter_base = record_addr + counter_offset as u64;

    let mut image = SyntheticImage::new();
    let record = ProfileDataRecord::new(0x11, 0x22, counter_offset as isize, num_counters);
    let counters: Vec<u64> = (0..u64::from(num_counters)).collect();
    let names: Vec<u8> = (0..names_len).map(|i| b'a' + (i % 26) as u8).collect();
    image
        .write_record(record_addr, &record)
        .write_counters(counter_base, &counters)
        .write(0x9000, &names);

    let mut registry = AddressRangeRegistry::new();
    registry.register_data(DataDescriptor {
        addr: record_addr,
        counter_offset,
        num_counters,
    });
    registry.register_names(0x9000, names_len as u64);
    (registry, image)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_ranges_ignore_registration_order((descs, shuffled) in registrations_strategy()) {
        prop_assert_eq!(registry_of(&descs).ranges(), registry_of(&shuffled).ranges());
    }

    #[test]
    fn prop_ranges_are_minimal_bounds(
        descs in prop::collection::vec(descriptor_strategy(), 1..MAX_RECORDS),
    ) {
        let ranges = registry_of(&descs).ranges();

        let data_start = descs.iter().map(|d| d.addr).min().unwrap();
        let data_end = descs.iter().map(|d| d.addr + RECORD_SIZE as u64).max().unwrap();
        prop_assert_eq!(ranges.data, SectionRange::new(data_start, data_end));

        let counters_start = descs.iter().map(|d| d.counter_base()).min().unwrap();
        let counters_end = descs
            .iter()
            .map(|d| d.counter_base() + u64::from(d.num_counters) * COUNTER_ENTRY_SIZE)
            .max()
            .unwrap();
        prop_assert_eq!(ranges.counters, SectionRange::new(counters_start, counters_end));
    }

    #[test]
    fn prop_sentinel_never_changes_ranges(
        descs in prop::collection::vec(descriptor_strategy(), 0..MAX_RECORDS),
        at in any::<prop::sample::Index>(),
    ) {
        let registry = registry_of(&descs);
        let before = registry.ranges();

        let mut with_sentinel = AddressRangeRegistry::new().with_sentinel(SENTINEL);
        let split = at.index(descs.len() + 1);
        for desc in &descs[..split] {
            with_sentinel.register_data(*desc);
        }
        let outcome = with_sentinel.register_data(DataDescriptor {
            addr: SENTINEL,
            counter_offset: 0,
            num_counters: 3,
        });
        for desc in &descs[split..] {
            with_sentinel.register_data(*desc);
        }

        prop_assert_eq!(outcome, Registration::SkippedSentinel);
        prop_assert_eq!(with_sentinel.ranges(), before);
        prop_assert_eq!(with_sentinel.registered(), registry.registered());
    }

    #[test]
    fn prop_short_write_anywhere_fails_and_closes(
        num_counters in 1u32..8,
        names_len in 1usize..40,
        at in any::<prop::sample::Index>(),
    ) {
        let (registry, image) = scenario(num_counters, names_len);

        let clean = MemTransport::new();
        RawFileSerializer::new(&registry, &image, DumpOptions::default())
            .write_to(&mut clean.clone(), FILE)
            .unwrap();
        let calls = clean.write_calls();

        let failing_call = at.index(calls);
        let transport = MemTransport::new().with_short_write_at(failing_call);
        let err = RawFileSerializer::new(&registry, &image, DumpOptions::default())
            .write_to(&mut transport.clone(), FILE)
            .unwrap_err();

        let is_short_write = matches!(
            err,
            ProfileError::Transport(TransportError::ShortWrite { .. })
        );
        prop_assert!(is_short_write);
        prop_assert_eq!(transport.write_calls(), failing_call + 1);
        prop_assert_eq!(transport.close_calls(), 1);
        prop_assert_eq!(transport.open_handles(), 0);
    }
}
