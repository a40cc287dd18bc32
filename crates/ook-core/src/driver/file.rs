//! File-backed radio
//!
//! Stands in for a HackRF-class transmitter: every transmitted buffer is
//! appended to a raw int8 I/Q file (playable with `hackrf_transfer -t`),
//! and receives are served from an optional capture file in the same
//! format. Transfers complete synchronously, so `busy()` is false as soon
//! as a start call returns.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{DeviceResult, RadioConfig, RadioDriver};
use crate::buffer::SampleBuffer;
use crate::error::DeviceError;

/// Parameter ranges accepted by a device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceLimits {
    /// Tunable centre frequencies in Hz
    pub frequency: RangeInclusive<f64>,
    /// Supported sample rates in Hz
    pub sample_rate: RangeInclusive<f64>,
    /// Maximum TX gain in dB
    pub max_tx_gain: u32,
    /// Maximum RX LNA gain in dB
    pub max_lna_gain: u32,
    /// Maximum RX VGA gain in dB
    pub max_vga_gain: u32,
}

impl DeviceLimits {
    /// HackRF One ranges
    pub fn hackrf() -> Self {
        Self {
            frequency: 1.0e6..=6.0e9,
            sample_rate: 2.0e6..=20.0e6,
            max_tx_gain: 47,
            max_lna_gain: 40,
            max_vga_gain: 62,
        }
    }

    /// Accept any finite positive frequency and rate
    pub fn unrestricted() -> Self {
        Self {
            frequency: f64::MIN_POSITIVE..=f64::MAX,
            sample_rate: f64::MIN_POSITIVE..=f64::MAX,
            max_tx_gain: u32::MAX,
            max_lna_gain: u32::MAX,
            max_vga_gain: u32::MAX,
        }
    }
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self::hackrf()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Idle,
    Tx,
    Rx,
}

/// Radio that writes transmissions to a file
#[derive(Debug)]
pub struct FileRadio {
    tx_path: PathBuf,
    writer: Option<BufWriter<File>>,
    capture: Option<File>,
    limits: DeviceLimits,
    config: Option<RadioConfig>,
    transfer: Transfer,
    rx_buffer: Option<SampleBuffer>,
    transmitted: usize,
    transmissions: usize,
}

impl FileRadio {
    /// Create (or truncate) the transmit file
    pub fn create(tx_path: impl AsRef<Path>) -> DeviceResult<Self> {
        let tx_path = tx_path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tx_path)?;

        Ok(Self {
            tx_path,
            writer: Some(BufWriter::new(file)),
            capture: None,
            limits: DeviceLimits::default(),
            config: None,
            transfer: Transfer::Idle,
            rx_buffer: None,
            transmitted: 0,
            transmissions: 0,
        })
    }

    /// Builder: serve receives from a raw int8 I/Q capture
    pub fn with_capture(mut self, capture_path: impl AsRef<Path>) -> DeviceResult<Self> {
        self.capture = Some(File::open(capture_path)?);
        Ok(self)
    }

    /// Builder: override accepted parameter ranges
    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Transmit file path
    pub fn tx_path(&self) -> &Path {
        &self.tx_path
    }

    /// Components written so far
    pub fn transmitted(&self) -> usize {
        self.transmitted
    }

    /// Completed `start_tx` calls
    pub fn transmissions(&self) -> usize {
        self.transmissions
    }

    /// Active configuration, once configured
    pub fn config(&self) -> Option<&RadioConfig> {
        self.config.as_ref()
    }

    fn ready(&self) -> DeviceResult<()> {
        if self.writer.is_none() || self.config.is_none() {
            return Err(DeviceError::NotStarted);
        }
        if self.transfer != Transfer::Idle {
            return Err(DeviceError::Busy);
        }
        Ok(())
    }

    fn check_gain(value: u32, max: u32, what: &str) -> DeviceResult<()> {
        if value > max {
            return Err(DeviceError::Config(format!("{what} {value} dB exceeds {max} dB")));
        }
        Ok(())
    }
}

impl RadioDriver for FileRadio {
    fn name(&self) -> &str {
        "file"
    }

    fn configure(&mut self, config: &RadioConfig) -> DeviceResult<()> {
        if self.writer.is_none() {
            return Err(DeviceError::NotStarted);
        }
        if !self.limits.frequency.contains(&config.center_frequency) {
            return Err(DeviceError::Config(format!(
                "centre frequency {} Hz out of range",
                config.center_frequency
            )));
        }
        if !self.limits.sample_rate.contains(&config.sample_rate) {
            return Err(DeviceError::Config(format!(
                "sample rate {} Hz out of range",
                config.sample_rate
            )));
        }
        debug!(
            frequency = config.center_frequency,
            sample_rate = config.sample_rate,
            "file radio configured"
        );
        self.config = Some(config.clone());
        Ok(())
    }

    fn set_transmit_gain(&mut self, gain: u32) -> DeviceResult<()> {
        Self::check_gain(gain, self.limits.max_tx_gain, "TX gain")?;
        if let Some(config) = self.config.as_mut() {
            config.tx_gain = gain;
        }
        Ok(())
    }

    fn set_receive_gain(&mut self, lna_gain: u32, vga_gain: u32) -> DeviceResult<()> {
        Self::check_gain(lna_gain, self.limits.max_lna_gain, "LNA gain")?;
        Self::check_gain(vga_gain, self.limits.max_vga_gain, "VGA gain")?;
        if let Some(config) = self.config.as_mut() {
            config.lna_gain = lna_gain;
            config.vga_gain = vga_gain;
        }
        Ok(())
    }

    fn set_amp_enable(&mut self, enable: bool) -> DeviceResult<()> {
        if let Some(config) = self.config.as_mut() {
            config.amp_enable = enable;
        }
        Ok(())
    }

    fn start_tx(&mut self, samples: &SampleBuffer) -> DeviceResult<()> {
        self.ready()?;
        let writer = self.writer.as_mut().ok_or(DeviceError::NotStarted)?;
        writer.write_all(&samples.to_bytes())?;

        self.transfer = Transfer::Tx;
        self.transmitted += samples.len();
        self.transmissions += 1;
        debug!(entries = samples.len(), total = self.transmitted, "file radio tx");
        Ok(())
    }

    fn start_rx(&mut self, sample_count: usize) -> DeviceResult<()> {
        self.ready()?;
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| DeviceError::Config("no capture file to receive from".into()))?;

        let mut bytes = vec![0u8; sample_count];
        capture.read_exact(&mut bytes).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                DeviceError::Transfer(format!("capture exhausted before {sample_count} samples"))
            }
            _ => DeviceError::Io(e),
        })?;

        self.rx_buffer = Some(SampleBuffer::from_bytes(&bytes));
        self.transfer = Transfer::Rx;
        Ok(())
    }

    fn busy(&self) -> bool {
        false
    }

    fn stop_transfer(&mut self) -> DeviceResult<()> {
        if self.transfer == Transfer::Tx {
            if let Some(writer) = self.writer.as_mut() {
                writer.flush()?;
            }
        }
        self.transfer = Transfer::Idle;
        Ok(())
    }

    fn read(&mut self) -> DeviceResult<SampleBuffer> {
        if self.transfer != Transfer::Idle {
            return Err(DeviceError::Busy);
        }
        self.rx_buffer.take().ok_or(DeviceError::NotStarted)
    }

    fn teardown(&mut self) -> DeviceResult<()> {
        let mut writer = self.writer.take().ok_or(DeviceError::NotStarted)?;
        writer.flush()?;
        if let Some(mut capture) = self.capture.take() {
            capture.seek(SeekFrom::Start(0))?;
        }
        self.config = None;
        self.transfer = Transfer::Idle;
        debug!(path = %self.tx_path.display(), total = self.transmitted, "file radio closed");
        Ok(())
    }
}
