use profrt_format::{
    build_header, AddressWidth, RawFileHeader, SectionLayout, SectionStarts, HEADER_SIZE,
};
use profrt_transport::{Transport, TransportWriter, VectoredWriter, WriteSegment};
use tracing::{debug, warn};

use crate::{AddressRangeRegistry, MemoryImage, ProfileError, Result, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpOptions {
    /// Selects the magic and record size. Only the native width can describe a `ProcessImage`.
    pub width: AddressWidth,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            width: AddressWidth::native(),
        }
    }
}

/// Progress of one [`RawFileSerializer::write_to`] call.
///
/// A failed segment jumps straight to `Closed`; the transport is still closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializerState {
    Idle,
    OpeningTransport,
    EmittingHeader,
    EmittingData,
    EmittingCounters,
    EmittingBitmap,
    EmittingNames,
    EmittingPadding,
    Closed,
}

/// Everything needed to emit a file, resolved before the transport is touched.
#[derive(Debug, Clone)]
pub struct RawFilePlan<'m> {
    pub header: RawFileHeader,
    pub layout: SectionLayout,
    header_bytes: [u8; HEADER_SIZE],
    data: &'m [u8],
    counters: &'m [u8],
    names: &'m [u8],
}

impl RawFilePlan<'_> {
    pub fn total_len(&self) -> u64 {
        HEADER_SIZE as u64
            + self.data.len() as u64
            + self.counters.len() as u64
            + self.layout.num_bitmap_bytes
            + self.layout.padding_after_bitmap
            + self.names.len() as u64
            + self.layout.padding_after_names
    }

    fn segments(&self) -> [(SerializerState, WriteSegment<'_>); 7] {
        [
            (
                SerializerState::EmittingHeader,
                WriteSegment::Bytes(&self.header_bytes),
            ),
            (SerializerState::EmittingData, WriteSegment::Bytes(self.data)),
            (
                SerializerState::EmittingCounters,
                WriteSegment::Bytes(self.counters),
            ),
            // The bitmap section is always empty in this layout.
            (SerializerState::EmittingBitmap, WriteSegment::Bytes(&[])),
            (
                SerializerState::EmittingBitmap,
                WriteSegment::Zeros(self.layout.padding_after_bitmap as usize),
            ),
            (SerializerState::EmittingNames, WriteSegment::Bytes(self.names)),
            (
                SerializerState::EmittingPadding,
                WriteSegment::Zeros(self.layout.padding_after_names as usize),
            ),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpSummary {
    pub header: RawFileHeader,
    pub bytes_written: u64,
}

/// Turns a populated registry into a raw profile file.
pub struct RawFileSerializer<'a, M: ?Sized> {
    registry: &'a AddressRangeRegistry,
    image: &'a M,
    options: DumpOptions,
    state: SerializerState,
}

impl<'a, M: MemoryImage + ?Sized> RawFileSerializer<'a, M> {
    pub fn new(registry: &'a AddressRangeRegistry, image: &'a M, options: DumpOptions) -> Self {
        Self {
            registry,
            image,
            options,
            state: SerializerState::Idle,
        }
    }

    pub fn state(&self) -> SerializerState {
        self.state
    }

    /// Compute the header and resolve every section's bytes.
    ///
    /// A non-native width is only accepted for images that are not live process memory.
    pub fn plan(&self) -> Result<RawFilePlan<'a>> {
        if self.image.is_live() && self.options.width != AddressWidth::native() {
            return Err(ProfileError::WidthMismatch {
                width: self.options.width,
            });
        }
        let ranges = self.registry.ranges();
        let layout = SectionLayout::compute(
            self.registry.record_size(),
            ranges.data.len(),
            ranges.counters.len(),
            ranges.names.len(),
        )?;
        let starts = SectionStarts {
            data: ranges.data.start,
            counters: ranges.counters.start,
            bitmap: ranges.data.start,
            names: ranges.names.start,
        };
        let header = build_header(self.options.width, &layout, &starts);

        debug!(
            num_data = layout.num_data,
            num_counters = layout.num_counters,
            names_size = layout.names_size,
            padding = layout.padding_after_names,
            "raw profile layout"
        );

        Ok(RawFilePlan {
            header,
            layout,
            header_bytes: header.encode(),
            data: self.section(Section::Data, starts.data, layout.data_bytes())?,
            counters: self.section(Section::Counters, starts.counters, layout.counters_bytes())?,
            names: self.section(Section::Names, starts.names, layout.names_size)?,
        })
    }

    fn section(&self, section: Section, start: u64, len: u64) -> Result<&'a [u8]> {
        let image: &'a M = self.image;
        image
            .read(start, len)
            .ok_or(ProfileError::SectionUnavailable {
                section,
                start,
                len,
            })
    }

    /// Open `file_name`, emit every section in order, then close.
    ///
    /// Planning failures return before the transport is opened. Once opened, the transport is
    /// closed exactly once whatever the outcome.
    pub fn write_to<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        file_name: &str,
    ) -> Result<DumpSummary> {
        self.state = SerializerState::Idle;
        let plan = self.plan()?;

        self.transition(SerializerState::OpeningTransport);
        let handle = match transport.open(file_name) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(transport = transport.name(), "cannot open {file_name}: {err}");
                self.transition(SerializerState::Closed);
                return Err(err.into());
            }
        };

        let mut writer = TransportWriter::new(&mut *transport, handle);
        let result = self.emit(&plan, &mut writer);
        let bytes_written = writer.bytes_written();

        transport.close(handle);
        self.transition(SerializerState::Closed);

        result?;
        debug!(bytes_written, "raw profile written");
        Ok(DumpSummary {
            header: plan.header,
            bytes_written,
        })
    }

    fn emit(&mut self, plan: &RawFilePlan<'_>, writer: &mut impl VectoredWriter) -> Result<()> {
        for (state, segment) in plan.segments() {
            if self.state != state {
                self.transition(state);
            }
            writer.write_segments(&[segment])?;
        }
        Ok(())
    }

    fn transition(&mut self, next: SerializerState) {
        debug!(from = ?self.state, to = ?next, "serializer state");
        self.state = next;
    }
}
