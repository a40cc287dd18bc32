//! OOK Packet Synthesis Command-Line Interface
//!
//! This CLI provides tools for:
//! - Inspecting the quantized carrier table
//! - Encoding messages into OOK symbol strings
//! - Generating int8 I/Q files for `hackrf_transfer -t`
//! - Building de Bruijn covering sequences
//! - Probing every address of a fixed-length code

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ook_core::debruijn::{de_bruijn, exhaustive_codes};
use ook_core::driver::{DeviceLimits, FileRadio, RadioConfig, RadioSession};
use ook_core::waveform::validate;
use ook_core::{OokParams, SymbolEncoder, WaveformGenerator};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ook")]
#[command(author, version, about = "OOK packet synthesis CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Modulation parameters shared by the synthesis commands
#[derive(Args, Debug, Clone)]
struct SynthArgs {
    /// Sample rate in Hz
    #[arg(long, default_value = "2000000")]
    sample_rate: f64,

    /// Carrier frequency in Hz (offset from the centre frequency)
    #[arg(long, default_value = "14000")]
    carrier: f64,

    /// Samples per 0/1 symbol
    #[arg(long, default_value = "800")]
    symbol_len: usize,

    /// Samples per 'p' pause
    #[arg(long, default_value = "20000")]
    pause_len: usize,

    /// Peak amplitude (0-127)
    #[arg(long, default_value = "127")]
    amplitude: f64,
}

impl SynthArgs {
    fn params(&self) -> OokParams {
        OokParams::default()
            .with_sample_rate(self.sample_rate)
            .with_carrier_freq(self.carrier)
            .with_symbol_len(self.symbol_len)
            .with_pause_len(self.pause_len)
            .with_amplitude(self.amplitude)
    }
}

/// Address enumeration order for `probe`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum AddressOrder {
    /// Binary counting 000, 001, 010, ...
    Counter,
    /// De Bruijn window order 000, 001, 010, 101, ...
    Debruijn,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the quantized carrier table
    Table {
        #[command(flatten)]
        synth: SynthArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encode a message into a symbol string
    Encode {
        /// Message to encode
        #[arg(short, long)]
        message: String,

        /// Substitution table, e.g. "0=100,1=110"
        #[arg(long, default_value = "0=100,1=110")]
        map: String,
    },

    /// Generate an int8 I/Q file from a packet
    Generate {
        /// Symbol string of 1, 0 and p (used as-is)
        #[arg(short, long, conflicts_with = "message")]
        packet: Option<String>,

        /// Message to encode with --map before generating
        #[arg(short, long)]
        message: Option<String>,

        /// Substitution table for --message
        #[arg(long, default_value = "0=100,1=110")]
        map: String,

        /// Symbols appended after encoding (e.g. "1p")
        #[arg(long, default_value = "")]
        suffix: String,

        /// Number of back-to-back copies
        #[arg(long, default_value = "1")]
        repeat: usize,

        /// Output file
        #[arg(short, long, default_value = "ook_samples.iq")]
        output: PathBuf,

        /// Fail on unknown symbols instead of skipping them
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        synth: SynthArgs,
    },

    /// Print a de Bruijn covering sequence
    Debruijn {
        /// Alphabet, one symbol per character
        #[arg(short, long, default_value = "01")]
        alphabet: String,

        /// Word length
        #[arg(short = 'n', long, default_value = "8")]
        length: usize,

        /// Append the first n-1 symbols so no window wraps
        #[arg(long)]
        linear: bool,

        /// Print consecutive codes of this width instead of the sequence
        #[arg(long)]
        width: Option<usize>,

        /// Print every distinct word, one per line
        #[arg(long, conflicts_with_all = ["width", "linear"])]
        words: bool,
    },

    /// Transmit a frame for every address of a fixed-length code
    Probe {
        /// Fixed bits sent before the address
        #[arg(long, default_value = "01100")]
        preamble: String,

        /// Address width in bits
        #[arg(long, default_value = "3")]
        addr_bits: usize,

        /// Address enumeration order
        #[arg(long, value_enum, default_value = "counter")]
        order: AddressOrder,

        /// Substitution table
        #[arg(long, default_value = "0=100,1=110")]
        map: String,

        /// Symbols appended after each encoded frame
        #[arg(long, default_value = "1p")]
        suffix: String,

        /// Copies of each frame per address
        #[arg(long, default_value = "32")]
        repeat: usize,

        /// Output file written by the file radio
        #[arg(short, long, default_value = "probe.iq")]
        output: PathBuf,

        /// Centre frequency in Hz
        #[arg(long, default_value = "433920000")]
        frequency: f64,

        /// TX gain in dB
        #[arg(long, default_value = "40")]
        tx_gain: u32,

        /// Enable the front-end amplifier
        #[arg(long)]
        amp: bool,

        #[command(flatten)]
        synth: SynthArgs,
    },

    /// Show OOK parameter calculations
    Info {
        #[command(flatten)]
        synth: SynthArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct TableReport {
    params: OokParams,
    period: usize,
    i: Vec<i8>,
    q: Vec<i8>,
}

#[derive(Serialize)]
struct InfoReport {
    params: OokParams,
    table_period: usize,
    table_entries: usize,
    actual_carrier_hz: f64,
    symbol_entries: usize,
    pause_entries: usize,
    symbol_us: f64,
    pause_us: f64,
    symbol_rate_baud: f64,
}

fn parse_encoder(map: &str) -> Result<SymbolEncoder> {
    SymbolEncoder::parse_pairs(map).with_context(|| format!("Invalid mapping: {}", map))
}

fn build_generator(synth: &SynthArgs) -> Result<WaveformGenerator> {
    WaveformGenerator::new(&synth.params()).context("Invalid modulation parameters")
}

fn address_codes(bits: usize, order: AddressOrder) -> Result<Vec<String>> {
    if bits == 0 || bits > 16 {
        bail!("Address width must be between 1 and 16 bits");
    }

    let codes: Vec<String> = match order {
        AddressOrder::Counter => (0..1usize << bits)
            .map(|i| format!("{:0width$b}", i, width = bits))
            .collect(),
        AddressOrder::Debruijn => exhaustive_codes(&['0', '1'], bits)?
            .into_iter()
            .map(|code| code.into_iter().collect())
            .collect(),
    };
    Ok(codes)
}

fn cmd_table(synth: SynthArgs, json: bool) -> Result<()> {
    let params = synth.params();
    let table = params.carrier().build().context("Invalid carrier parameters")?;

    if json {
        let report = TableReport {
            params,
            period: table.period(),
            i: table.in_phase(),
            q: table.quadrature(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", table);
    }
    Ok(())
}

fn cmd_encode(message: String, map: String) -> Result<()> {
    let encoder = parse_encoder(&map)?;
    let encoded = encoder.encode(&message);

    for m in validate(&encoded) {
        warn!("Symbol '{}' at position {} is not 1/0/p", m.symbol, m.position);
    }
    println!("{}", encoded);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_generate(
    packet: Option<String>,
    message: Option<String>,
    map: String,
    suffix: String,
    repeat: usize,
    output: PathBuf,
    strict: bool,
    synth: SynthArgs,
) -> Result<()> {
    let packet = match (packet, message) {
        (Some(packet), _) => packet + &suffix,
        (None, Some(message)) => parse_encoder(&map)?.encode(&message) + &suffix,
        (None, None) => bail!("Either --packet or --message is required"),
    };
    if repeat == 0 {
        bail!("--repeat must be at least 1");
    }

    let generator = build_generator(&synth)?;
    info!("Packet: {}", packet);

    let samples = if strict {
        generator
            .generate_strict(&packet)
            .context("Packet contains an unknown symbol")?
    } else {
        let synthesis = generator.generate(&packet);
        if !synthesis.is_clean() {
            warn!("Skipped {} unknown symbol(s)", synthesis.malformed.len());
        }
        synthesis.samples
    };

    let burst = samples.repeat(repeat);
    burst
        .write_file(&output)
        .with_context(|| format!("Failed to write {:?}", output))?;

    println!(
        "Generated {} I/Q samples ({:.3} ms) x {} -> {:?}",
        samples.complex_len(),
        generator.duration(&samples) * 1000.0,
        repeat,
        output
    );
    Ok(())
}

fn cmd_debruijn(
    alphabet: String,
    length: usize,
    linear: bool,
    width: Option<usize>,
    words: bool,
) -> Result<()> {
    let symbols: Vec<char> = alphabet.chars().collect();
    let seq = de_bruijn(&symbols, length).context("Cannot build de Bruijn sequence")?;
    info!("B({}, {}) has {} symbols", symbols.len(), length, seq.len());

    if words {
        for word in seq.windows() {
            println!("{}", word.into_iter().collect::<String>());
        }
    } else if let Some(width) = width {
        if width == 0 {
            bail!("--width must be at least 1");
        }
        for code in seq.codes(width) {
            println!("{}", code.iter().collect::<String>());
        }
    } else if linear {
        println!("{}", seq.linear().into_iter().collect::<String>());
    } else {
        println!("{}", seq);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_probe(
    preamble: String,
    addr_bits: usize,
    order: AddressOrder,
    map: String,
    suffix: String,
    repeat: usize,
    output: PathBuf,
    radio: RadioConfig,
    synth: SynthArgs,
) -> Result<()> {
    let encoder = parse_encoder(&map)?;
    let generator = build_generator(&synth)?;
    let codes = address_codes(addr_bits, order)?;

    // Setup Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    let driver = FileRadio::create(&output)
        .with_context(|| format!("Failed to create {:?}", output))?
        .with_limits(DeviceLimits::hackrf());
    let mut session = RadioSession::open(driver, &radio)
        .context("Failed to open radio")?
        .with_poll_interval(Duration::from_millis(100));

    println!("=== OOK Address Probe ===");
    println!();
    println!("Preamble:  {}", preamble);
    println!("Addresses: {} ({} bits, {:?} order)", codes.len(), addr_bits, order);
    println!("Repeat:    {}", repeat);
    println!("Output:    {:?}", output);
    println!();

    let mut sent = 0;
    for addr in &codes {
        if !running.load(Ordering::SeqCst) {
            warn!("Interrupted after {} of {} addresses", sent, codes.len());
            break;
        }

        let packet = encoder.encode(&format!("{}{}", preamble, addr)) + &suffix;
        let synthesis = generator.generate(&packet);
        if !synthesis.is_clean() {
            warn!("Address {}: skipped {} unknown symbol(s)", addr, synthesis.malformed.len());
        }

        session
            .transmit_repeated(&synthesis.samples, repeat)
            .with_context(|| format!("Transmit failed for address {}", addr))?;
        info!("Sent address {} ({} symbols)", addr, packet.len());
        sent += 1;
    }

    let total = session.driver().transmitted() / 2;
    session.close().context("Failed to close radio")?;

    println!(
        "Sent {} addresses, {} I/Q samples ({:.3} s at {} S/s)",
        sent,
        total,
        total as f64 / synth.sample_rate,
        synth.sample_rate
    );
    Ok(())
}

fn cmd_info(synth: SynthArgs, json: bool) -> Result<()> {
    let params = synth.params();
    let generator = build_generator(&synth)?;
    let table = generator.table();

    let report = InfoReport {
        params,
        table_period: table.period(),
        table_entries: table.len(),
        actual_carrier_hz: params.sample_rate / table.period() as f64,
        symbol_entries: generator.symbol_len(),
        pause_entries: generator.pause_len(),
        symbol_us: params.symbol_duration() * 1e6,
        pause_us: params.pause_duration() * 1e6,
        symbol_rate_baud: 1.0 / params.symbol_duration(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("=== OOK Parameters ===");
    println!();
    println!("Sample rate:      {} S/s", params.sample_rate);
    println!("Carrier:          {} Hz", params.carrier_freq);
    println!(
        "Table period:     {} samples ({} entries)",
        report.table_period, report.table_entries
    );
    println!("Actual carrier:   {:.1} Hz", report.actual_carrier_hz);
    println!("Amplitude:        {}", params.amplitude);
    println!();
    println!("Symbol:           {} samples, {:.1} us", params.symbol_len, report.symbol_us);
    println!("Pause:            {} samples, {:.1} us", params.pause_len, report.pause_us);
    println!("Symbol rate:      {:.1} baud", report.symbol_rate_baud);

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Table { synth, json } => cmd_table(synth, json),

        Commands::Encode { message, map } => cmd_encode(message, map),

        Commands::Generate {
            packet,
            message,
            map,
            suffix,
            repeat,
            output,
            strict,
            synth,
        } => cmd_generate(packet, message, map, suffix, repeat, output, strict, synth),

        Commands::Debruijn {
            alphabet,
            length,
            linear,
            width,
            words,
        } => cmd_debruijn(alphabet, length, linear, width, words),

        Commands::Probe {
            preamble,
            addr_bits,
            order,
            map,
            suffix,
            repeat,
            output,
            frequency,
            tx_gain,
            amp,
            synth,
        } => {
            let radio = RadioConfig {
                center_frequency: frequency,
                sample_rate: synth.sample_rate,
                tx_gain,
                amp_enable: amp,
                ..Default::default()
            };
            cmd_probe(preamble, addr_bits, order, map, suffix, repeat, output, radio, synth)
        }

        Commands::Info { synth, json } => cmd_info(synth, json),
    }
}
