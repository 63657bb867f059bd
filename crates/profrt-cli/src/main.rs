#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use profrt_format::{ProfileDataRecord, COUNTER_ENTRY_SIZE, DEFAULT_FILE_NAME, RECORD_SIZE};
use profrt_runtime::{DataDescriptor, DumpOptions, ProfileRuntime, SyntheticImage};
use profrt_transport::FsTransport;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Synthetic section bases; far enough apart that no configuration makes them overlap.
const SENTINEL_ADDR: u64 = 0x0000_1000;
const DATA_BASE: u64 = 0x0010_0000;
const COUNTERS_BASE: u64 = 0x0100_0000;
const NAMES_BASE: u64 = 0x1000_0000;

const MAX_FUNCTIONS: u32 = 4096;
const MAX_COUNTERS: u32 = 1024;
const MAX_NAMES_LEN: u64 = 1024 * 1024;

#[derive(Debug, Parser)]
#[command(
    name = "profrt-smoke",
    about = "Register a synthetic instrumented image and dump it as default.profraw"
)]
struct Args {
    /// Directory the raw profile is written to
    #[arg(long, value_name = "DIR", env = "PROFRT_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Number of instrumented functions
    #[arg(long, default_value_t = 4)]
    functions: u32,

    /// Counters per function
    #[arg(long, default_value_t = 3)]
    counters: u32,

    /// Length of the name blob in bytes
    #[arg(long, value_name = "BYTES", default_value_t = 32)]
    names_len: u64,

    /// Log filter, e.g. `info` or `profrt_runtime=debug`
    #[arg(long, env = "PROFRT_LOG", default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&args.log_level)
                .with_context(|| format!("invalid --log-level {:?}", args.log_level))?,
        )
        .with_writer(std::io::stderr)
        .init();

    if args.functions > MAX_FUNCTIONS {
        bail!("--functions must be at most {MAX_FUNCTIONS}");
    }
    if args.counters > MAX_COUNTERS {
        bail!("--counters must be at most {MAX_COUNTERS}");
    }
    if args.names_len > MAX_NAMES_LEN {
        bail!("--names-len must be at most {MAX_NAMES_LEN}");
    }
    if !args.out_dir.is_dir() {
        bail!("output directory {} does not exist", args.out_dir.display());
    }

    let (runtime, image) = synthesize(&args);
    let mut transport = FsTransport::new(&args.out_dir);

    let summary = runtime
        .shutdown(&mut transport, &image)
        .context("profile dump was never scheduled")?
        .context("failed to write raw profile")?;

    info!(
        path = %args.out_dir.join(DEFAULT_FILE_NAME).display(),
        bytes = summary.bytes_written,
        functions = summary.header.num_data,
        counters = summary.header.num_counters,
        names = summary.header.names_size,
        "raw profile written"
    );
    Ok(())
}

/// Lay out records, counters and names the way an instrumented binary's sections would be, and
/// register them in startup order: the sentinel first, then every record, then the names.
fn synthesize(args: &Args) -> (ProfileRuntime, SyntheticImage) {
    let mut runtime = ProfileRuntime::new(DumpOptions::default()).with_sentinel(SENTINEL_ADDR);
    let mut image = SyntheticImage::new();

    runtime.register_data(DataDescriptor {
        addr: SENTINEL_ADDR,
        counter_offset: 0,
        num_counters: 0,
    });

    let counters_per_fn = u64::from(args.counters);
    for idx in 0..u64::from(args.functions) {
        let record_addr = DATA_BASE + idx * RECORD_SIZE as u64;
        let counters_addr = COUNTERS_BASE + idx * counters_per_fn * COUNTER_ENTRY_SIZE;
        let counter_offset = counters_addr as i64 - record_addr as i64;

        let record = ProfileDataRecord::new(
            0x9E37_79B9_7F4A_7C15u64.wrapping_mul(idx + 1),
            idx,
            counter_offset as isize,
            args.counters,
        );
        let hits: Vec<u64> = (0..counters_per_fn).map(|c| (idx + 1) * (c + 1)).collect();
        image
            .write_record(record_addr, &record)
            .write_counters(counters_addr, &hits);

        runtime.register_data(DataDescriptor {
            addr: record_addr,
            counter_offset,
            num_counters: args.counters,
        });
    }

    if args.names_len > 0 {
        let names: Vec<u8> = (0..args.names_len)
            .map(|i| b"profrt_fn\0"[i as usize % 10])
            .collect();
        image.write(NAMES_BASE, &names);
        runtime.register_names(NAMES_BASE, args.names_len);
    }

    (runtime, image)
}
