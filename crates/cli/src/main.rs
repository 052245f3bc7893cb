//! DRAM PUF command-line tool.
//!
//! This binary drives the engine offline. It provides:
//! 1. **Encode:** Convert an enrollment JSON list into the wire blob written to the device.
//! 2. **Inspect:** Decode a wire blob and list its records.
//! 3. **Verify:** Reconstruct responses from a raw dump of the decay region and compare
//!    them with the enrolled values.
//! 4. **Simulate:** Run a complete session against simulated DRAM, planting the enrolled
//!    responses with optional bit noise to exercise error correction.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::{ArgAction, Parser, Subcommand};
use drampuf_core::PufEngine;
use drampuf_core::common::PhysAddr;
use drampuf_core::common::constants::{MILLIS_PER_SECOND, RESPONSE_BITS};
use drampuf_core::config::Config;
use drampuf_core::engine::{PufState, ResponseReconstructor};
use drampuf_core::hw::{DecayRegion, PhysMemory, RegionOrigin};
use drampuf_core::protocol::{Enrollment, EnrollmentEntry, EnrollmentRecord, encode_enrollment};
use drampuf_core::sim::{SimDram, SimRegisters};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Simulated DRAM size used by `simulate` unless overridden (1 MiB).
const DEFAULT_SIM_DRAM: u64 = 1 << 20;

#[derive(Parser, Debug)]
#[command(
    name = "pufctl",
    author,
    version,
    about = "DRAM decay PUF enrollment and verification tool",
    long_about = "Encode enrollments for the PUF device, inspect wire blobs, verify region dumps and simulate sessions.\n\nExamples:\n  pufctl encode enroll.json -o enroll.bin --seal 8 --sealed-json sealed.json\n  pufctl inspect enroll.bin\n  pufctl verify --dump region.bin --enrollment sealed.json --base 0x90000000\n  pufctl simulate --enrollment sealed.json --noise 2"
)]
struct Cli {
    /// Log verbosity (-v info, -vv debug); `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode an enrollment JSON list into the wire blob written to the device.
    Encode {
        /// Enrollment JSON: a list of `{decay_time, pointers, auth_value, parity}`.
        input: PathBuf,

        /// Output blob.
        #[arg(short, long)]
        output: PathBuf,

        /// Recompute every parity list from `auth_value` with this many symbols.
        #[arg(long)]
        seal: Option<usize>,

        /// Also write the sealed entries back as JSON.
        #[arg(long, requires = "seal")]
        sealed_json: Option<PathBuf>,
    },

    /// List the records of a wire blob.
    Inspect {
        /// Blob produced by `encode`.
        blob: PathBuf,
    },

    /// Reconstruct responses from a raw dump of the decay region.
    Verify {
        /// Raw region bytes, as read from physical memory.
        #[arg(long)]
        dump: PathBuf,

        /// Enrollment JSON holding the expected responses.
        #[arg(long)]
        enrollment: PathBuf,

        /// Engine configuration JSON.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Physical address of the first dumped byte; defaults to `region.phys_base`.
        #[arg(long, value_parser = parse_addr)]
        base: Option<u64>,
    },

    /// Run one session through the engine on simulated DRAM.
    Simulate {
        /// Enrollment JSON holding the responses to plant.
        #[arg(long)]
        enrollment: PathBuf,

        /// Engine configuration JSON.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Cells flipped per record before each read.
        #[arg(long, default_value_t = 0)]
        noise: usize,

        /// Passes over the enrollment list.
        #[arg(long, default_value_t = 1)]
        laps: usize,

        /// Size of the simulated DRAM in bytes.
        #[arg(long, value_parser = parse_addr, default_value_t = DEFAULT_SIM_DRAM)]
        dram_size: u64,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Encode {
            input,
            output,
            seal,
            sealed_json,
        } => cmd_encode(&input, &output, seal, sealed_json.as_deref()).map(|()| true),
        Commands::Inspect { blob } => cmd_inspect(&blob).map(|()| true),
        Commands::Verify {
            dump,
            enrollment,
            config,
            base,
        } => cmd_verify(&dump, &enrollment, config.as_deref(), base),
        Commands::Simulate {
            enrollment,
            config,
            noise,
            laps,
            dram_size,
        } => cmd_simulate(&enrollment, config.as_deref(), noise, laps, dram_size),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parses a decimal or `0x`-prefixed hexadecimal number; `_` separators are allowed.
fn parse_addr(s: &str) -> Result<u64, String> {
    let trimmed = s.trim();
    let (digits, radix) = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (trimmed, 10),
    };
    u64::from_str_radix(&digits.replace('_', ""), radix)
        .map_err(|err| format!("invalid number {trimmed:?}: {err}"))
}

fn load_entries(path: &Path) -> CliResult<Vec<EnrollmentEntry>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn load_config(path: Option<&Path>) -> CliResult<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}

fn to_records(entries: &[EnrollmentEntry]) -> CliResult<Vec<EnrollmentRecord>> {
    Ok(entries
        .iter()
        .enumerate()
        .map(|(i, entry)| entry.to_record(i))
        .collect::<Result<_, _>>()?)
}

/// Writes the wire blob for an enrollment list, optionally sealing it first.
fn cmd_encode(
    input: &Path,
    output: &Path,
    seal: Option<usize>,
    sealed_json: Option<&Path>,
) -> CliResult<()> {
    let mut entries = load_entries(input)?;
    if let Some(parity) = seal {
        for entry in &mut entries {
            let pointers = std::mem::take(&mut entry.pointers);
            *entry = EnrollmentEntry::sealed(entry.decay_time, pointers, entry.auth_value, parity)?;
        }
        info!(parity, records = entries.len(), "sealed enrollment");
    }

    let blob = encode_enrollment(&entries)?;
    fs::write(output, &blob)?;
    if let Some(path) = sealed_json {
        fs::write(path, serde_json::to_string_pretty(&entries)?)?;
    }
    println!(
        "{} records, {} bytes -> {}",
        entries.len(),
        blob.len(),
        output.display()
    );
    Ok(())
}

/// Prints one line per record of a wire blob.
fn cmd_inspect(path: &Path) -> CliResult<()> {
    let blob = fs::read(path)?;
    let mut enrollment = Enrollment::parse(&blob)?;
    println!("{} records, {} bytes", enrollment.records(), blob.len());
    for index in 0..enrollment.records() {
        let next = enrollment.next_record()?;
        let record = &next.record;
        let blocks = record.pointers.iter().map(|p| p.block());
        let lowest = blocks.clone().min().unwrap_or_default();
        let highest = blocks.max().unwrap_or_default();
        println!(
            "  #{index:<3} @{:<6} decay {:>5}s  parity {:>3}  words {lowest}..={highest}",
            next.offset,
            record.decay_seconds,
            record.parity.len(),
        );
    }
    Ok(())
}

/// Replays every record over a region dump.
///
/// # Returns
///
/// `true` if every response reconstructs to its enrolled value.
fn cmd_verify(
    dump: &Path,
    enrollment: &Path,
    config: Option<&Path>,
    base: Option<u64>,
) -> CliResult<bool> {
    let config = load_config(config)?;
    let base = base
        .or(config.region.phys_base)
        .ok_or("region base unknown: pass --base or set region.phys_base")?;
    let image = fs::read(dump)?;
    let region = DecayRegion::new(
        PhysAddr::new(base),
        image.len() as u64,
        RegionOrigin::CallerSupplied,
    );
    let mut mem = SimDram::from_image(PhysAddr::new(base), image);
    let entries = load_entries(enrollment)?;
    let records = to_records(&entries)?;
    debug!(%region, records = records.len(), "verifying dump");

    let mut reconstructor = ResponseReconstructor::new();
    let mut failures = 0;
    for (i, (entry, record)) in entries.iter().zip(&records).enumerate() {
        match reconstructor.reconstruct(&mut mem, &region, record) {
            Ok(corrected) if corrected.value == entry.auth_value => println!(
                "#{i}: ok {:#010x} ({} corrected)",
                corrected.value, corrected.errors
            ),
            Ok(corrected) => {
                failures += 1;
                println!(
                    "#{i}: mismatch {:#010x}, expected {:#010x}",
                    corrected.value, entry.auth_value
                );
            }
            Err(err) => {
                failures += 1;
                println!("#{i}: failed: {err} (status {})", err.status());
            }
        }
    }
    println!("{}/{} responses verified", records.len() - failures, records.len());
    Ok(failures == 0)
}

/// Sets the cells of `record` so they read back as `value`, with the first
/// `noise` cells inverted.
fn plant_response(
    mem: &mut SimDram,
    base: PhysAddr,
    record: &EnrollmentRecord,
    value: u32,
    noise: usize,
) -> CliResult<()> {
    for (i, pointer) in record.pointers.iter().enumerate() {
        let addr = base.offset(pointer.byte_offset());
        let bit = ((value >> (RESPONSE_BITS - 1 - i)) & 1 == 1) != (i < noise);
        let mask = 1u16 << pointer.bit();
        let word = mem.read_u16(addr)?;
        mem.write_u16(addr, if bit { word | mask } else { word & !mask })?;
    }
    Ok(())
}

/// Runs one session on simulated DRAM.
///
/// # Returns
///
/// `true` if every read returned the enrolled response.
fn cmd_simulate(
    enrollment: &Path,
    config: Option<&Path>,
    noise: usize,
    laps: usize,
    dram_size: u64,
) -> CliResult<bool> {
    let mut config = load_config(config)?;
    config.dram.end = config
        .dram
        .base
        .checked_add(dram_size)
        .and_then(|end| end.checked_sub(1))
        .ok_or("simulated DRAM size out of range")?;
    let entries = load_entries(enrollment)?;
    let records = to_records(&entries)?;
    let blob = encode_enrollment(&entries)?;

    let mem = SimDram::new(PhysAddr::new(config.dram.base), usize::try_from(dram_size)?);
    let mut engine = PufEngine::new(config, SimRegisters::new(), mem)?;
    let warm_up_ms =
        u64::from(engine.config().warm_up.retries) * engine.config().warm_up.settle_ms;
    engine.advance(warm_up_ms);
    if engine.state() != PufState::Idle {
        return Err(format!("engine not ready after warm-up: {}", engine.state()).into());
    }

    let handle = engine.open()?;
    let _ = engine.write(handle, &blob)?;
    let mut failures = 0;
    let mut reads = 0;
    'laps: for _ in 0..laps {
        for (i, (entry, record)) in entries.iter().zip(&records).enumerate() {
            if engine.session().is_none() {
                break 'laps;
            }
            let base = engine.region().base();
            plant_response(engine.memory_mut(), base, record, entry.auth_value, noise)?;
            engine.advance(u64::from(record.decay_seconds) * MILLIS_PER_SECOND);

            let mut buf = [0u8; 4];
            reads += 1;
            match engine.read(handle, &mut buf) {
                Ok(n) if n == buf.len() && u32::from_be_bytes(buf) == entry.auth_value => {
                    println!("#{i}: ok {:#010x}", entry.auth_value);
                }
                Ok(n) if n == buf.len() => {
                    failures += 1;
                    println!(
                        "#{i}: mismatch {:#010x}, expected {:#010x}",
                        u32::from_be_bytes(buf),
                        entry.auth_value
                    );
                }
                Ok(_) => {
                    failures += 1;
                    println!("#{i}: no response after {}s", record.decay_seconds);
                }
                Err(err) => {
                    failures += 1;
                    println!("#{i}: failed: {err} (status {})", err.status());
                }
            }
        }
    }

    let health = engine.health();
    println!(
        "{}/{reads} responses verified, {} symbols corrected, {} sweeps, latch {:?}",
        reads - failures,
        health.stats.corrected_symbols,
        health.sweeps,
        health.latch
    );
    if engine.session().is_some() {
        engine.close(handle)?;
    }
    engine.shutdown();
    Ok(failures == 0)
}
