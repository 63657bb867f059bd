use profrt_format::DEFAULT_FILE_NAME;
use profrt_transport::Transport;
use tracing::{error, info};

use crate::{
    AddressRangeRegistry, DataDescriptor, DumpOptions, DumpSummary, FinalizationGate,
    MemoryImage, RawFileSerializer, Registration, Result,
};

/// Per-process profiling state: the registry, the dump-once gate and the output options.
#[derive(Debug)]
pub struct ProfileRuntime {
    registry: AddressRangeRegistry,
    gate: FinalizationGate,
    options: DumpOptions,
}

impl Default for ProfileRuntime {
    fn default() -> Self {
        Self::new(DumpOptions::default())
    }
}

impl ProfileRuntime {
    pub fn new(options: DumpOptions) -> Self {
        Self {
            registry: AddressRangeRegistry::with_record_size(options.width.record_size()),
            gate: FinalizationGate::new(),
            options,
        }
    }

    pub fn with_sentinel(mut self, addr: u64) -> Self {
        self.registry = self.registry.with_sentinel(addr);
        self
    }

    pub fn options(&self) -> DumpOptions {
        self.options
    }

    pub fn registry(&self) -> &AddressRangeRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &FinalizationGate {
        &self.gate
    }

    /// Register the record at `addr`, calling `describe` only if it is not the sentinel.
    ///
    /// The gate is armed first, so even the sentinel registration schedules the dump.
    pub fn register_data_with(
        &mut self,
        addr: u64,
        describe: impl FnOnce() -> DataDescriptor,
    ) -> Registration {
        if self.gate.arm() {
            info!("profile dump scheduled");
        }
        if self.registry.is_sentinel(addr) {
            return self.registry.register_data(DataDescriptor {
                addr,
                counter_offset: 0,
                num_counters: 0,
            });
        }
        self.registry.register_data(describe())
    }

    pub fn register_data(&mut self, desc: DataDescriptor) -> Registration {
        self.register_data_with(desc.addr, || desc)
    }

    pub fn register_names(&mut self, start: u64, len: u64) {
        self.registry.register_names(start, len);
    }

    /// Dump now, regardless of the gate.
    pub fn write_file<T, M>(&self, transport: &mut T, image: &M) -> Result<DumpSummary>
    where
        T: Transport + ?Sized,
        M: MemoryImage + ?Sized,
    {
        RawFileSerializer::new(&self.registry, image, self.options)
            .write_to(transport, DEFAULT_FILE_NAME)
    }

    /// Fire the gate. Returns `None` if nothing was registered or the dump already ran.
    pub fn shutdown<T, M>(&self, transport: &mut T, image: &M) -> Option<Result<DumpSummary>>
    where
        T: Transport + ?Sized,
        M: MemoryImage + ?Sized,
    {
        self.gate.fire(|| {
            let result = self.write_file(transport, image);
            match &result {
                Ok(summary) => info!(
                    bytes = summary.bytes_written,
                    functions = summary.header.num_data,
                    "profile written"
                ),
                Err(err) => error!("profile dump failed: {err}"),
            }
            result
        })
    }

    /// Drop every registration and disarm the gate.
    pub fn reset(&mut self) {
        self.registry.reset();
        self.gate.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyntheticImage;
    use profrt_format::{AddressWidth, ProfileDataRecord};
    use profrt_transport::MemTransport;

    const SENTINEL: u64 = 0x10;

    fn runtime_with_one_function() -> (ProfileRuntime, SyntheticImage) {
        let mut runtime = ProfileRuntime::default().with_sentinel(SENTINEL);
        let mut image = SyntheticImage::new();
        let record = ProfileDataRecord::new(1, 2, 0x100, 1);
        image
            .write_record(0x2000, &record)
            .write_counters(0x2100, &[7])
            .write(0x4000, b"f");
        runtime.register_data(DataDescriptor {
            addr: 0x2000,
            counter_offset: 0x100,
            num_counters: 1,
        });
        runtime.register_names(0x4000, 1);
        (runtime, image)
    }

    #[test]
    fn sentinel_arms_without_describing() {
        let mut runtime = ProfileRuntime::default().with_sentinel(SENTINEL);
        let outcome = runtime.register_data_with(SENTINEL, || panic!("sentinel was dereferenced"));
        assert_eq!(outcome, Registration::SkippedSentinel);
        assert!(runtime.gate().is_armed());
        assert_eq!(runtime.registry().registered(), 0);
    }

    #[test]
    fn record_size_follows_width() {
        let runtime = ProfileRuntime::new(DumpOptions {
            width: AddressWidth::Bits32,
        });
        assert_eq!(runtime.registry().record_size(), 48);
    }

    #[test]
    fn shutdown_dumps_once() {
        let (runtime, image) = runtime_with_one_function();
        let mut transport = MemTransport::new();

        let summary = runtime.shutdown(&mut transport, &image).unwrap().unwrap();
        assert_eq!(summary.header.num_data, 1);
        assert!(runtime.shutdown(&mut transport, &image).is_none());
        assert_eq!(transport.open_calls(), 1);
        assert!(runtime.gate().has_fired());
    }

    #[test]
    fn shutdown_without_registrations_is_a_no_op() {
        let runtime = ProfileRuntime::default();
        let mut transport = MemTransport::new();
        assert!(runtime.shutdown(&mut transport, &SyntheticImage::new()).is_none());
        assert_eq!(transport.open_calls(), 0);
    }

    #[test]
    fn write_file_ignores_the_gate() {
        let (runtime, image) = runtime_with_one_function();
        let mut transport = MemTransport::new();

        runtime.write_file(&mut transport, &image).unwrap();
        runtime.shutdown(&mut transport, &image).unwrap().unwrap();
        runtime.write_file(&mut transport, &image).unwrap();
        assert_eq!(transport.open_calls(), 3);
        assert!(transport.file(DEFAULT_FILE_NAME).is_some());
    }

    #[test]
    fn reset_disarms() {
        let (mut runtime, image) = runtime_with_one_function();
        runtime.reset();
        assert!(!runtime.gate().is_armed());
        assert_eq!(runtime.registry().registered(), 0);
        assert!(runtime.shutdown(&mut MemTransport::new(), &image).is_none());
    }
}
