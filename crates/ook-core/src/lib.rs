//! # OOK Core Synthesis Library
//!
//! This crate turns symbolic on-off-keyed packets into interleaved signed
//! 8-bit I/Q sample buffers for a radio front end, and generates de Bruijn
//! covering sequences for exhaustively enumerating fixed-length codes.
//!
//! ## Overview
//!
//! - **Carrier table**: one quantized period of a complex carrier
//! - **Symbol encoding**: character substitution, e.g. `0 -> 100`, `1 -> 110`
//! - **Waveform generation**: phase-continuous expansion of `1`/`0`/`p`
//!   symbols into samples
//! - **Covering sequences**: lexicographically least de Bruijn sequences
//! - **Radio driver**: the transmit/receive handshake around a driver, and a
//!   file-backed driver producing `hackrf_transfer`-compatible files
//!
//! ## Signal Flow
//!
//! ```text
//! message ──> SymbolEncoder ──> "110100...1p" ──> WaveformGenerator ──> SampleBuffer ──> RadioSession
//!                                                        ^
//!                                                  CarrierTable
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use ook_core::{OokParams, SymbolEncoder, WaveformGenerator};
//!
//! let params = OokParams::default()
//!     .with_carrier_freq(14_000.0)
//!     .with_symbol_len(800)
//!     .with_pause_len(20_000);
//!
//! let generator = WaveformGenerator::new(&params)?;
//! let packet = SymbolEncoder::pwm_doorbell().encode("01100101") + "1p";
//! let synthesis = generator.generate(&packet);
//! assert!(synthesis.is_clean());
//!
//! let burst = synthesis.samples.repeat(32);
//! burst.write_file("doorbell.iq")?;
//! # Ok::<(), ook_core::OokError>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod buffer;
pub mod carrier;
pub mod debruijn;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod waveform;

// Re-export main types
pub use buffer::SampleBuffer;
pub use carrier::{CarrierTable, CarrierTableBuilder};
pub use debruijn::{de_bruijn, de_bruijn_str, exhaustive_codes, CoveringSequence};
pub use driver::{FileRadio, RadioConfig, RadioDriver, RadioSession};
pub use encoder::SymbolEncoder;
pub use error::{DeviceError, OokError, Result};
pub use waveform::{MalformedSymbol, OokParams, PhaseCounter, Symbol, Synthesis, WaveformGenerator};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::buffer::SampleBuffer;
    pub use crate::carrier::{CarrierTable, CarrierTableBuilder};
    pub use crate::debruijn::{de_bruijn, de_bruijn_str};
    pub use crate::driver::{RadioConfig, RadioDriver, RadioSession};
    pub use crate::encoder::SymbolEncoder;
    pub use crate::waveform::{OokParams, WaveformGenerator};
}
