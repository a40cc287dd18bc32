//! Radio driver interface
//!
//! The synthesis core never talks to hardware. It hands finished
//! [`SampleBuffer`]s to something implementing [`RadioDriver`], and
//! [`RadioSession`] enforces the transfer handshake around it:
//!
//! ```text
//! open ──> configure ──> set gains
//!            │
//!            ├─> start_tx(buf) ──> poll busy() ──> stop_transfer()
//!            ├─> start_rx(n)   ──> poll busy() ──> stop_transfer() ──> read()
//!            │
//! close ──> teardown()            (exactly once, also on drop)
//! ```
//!
//! Driver errors are passed through as [`DeviceError`] without retries.

mod file;

pub use file::{DeviceLimits, FileRadio};

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::buffer::SampleBuffer;
use crate::error::{DeviceError, Result};

/// Result type for driver operations
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Default interval between `busy()` polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Radio front-end configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioConfig {
    /// Centre frequency in Hz
    pub center_frequency: f64,
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// TX VGA gain in dB
    pub tx_gain: u32,
    /// RX LNA gain in dB
    pub lna_gain: u32,
    /// RX VGA gain in dB
    pub vga_gain: u32,
    /// Front-end amplifier
    pub amp_enable: bool,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            center_frequency: 433_920_000.0,
            sample_rate: 2_000_000.0,
            tx_gain: 40,
            lna_gain: 24,
            vga_gain: 16,
            amp_enable: false,
        }
    }
}

/// Interface to a transmit/receive capable radio
///
/// Receive counts are in interleaved components, matching
/// [`SampleBuffer::len`].
pub trait RadioDriver {
    /// Driver name for logs
    fn name(&self) -> &str;

    /// Tune and set the sample rate
    fn configure(&mut self, config: &RadioConfig) -> DeviceResult<()>;

    /// Set TX gain
    fn set_transmit_gain(&mut self, gain: u32) -> DeviceResult<()>;

    /// Set RX LNA and VGA gains
    fn set_receive_gain(&mut self, lna_gain: u32, vga_gain: u32) -> DeviceResult<()>;

    /// Enable or disable the front-end amplifier
    fn set_amp_enable(&mut self, enable: bool) -> DeviceResult<()>;

    /// Begin transmitting a buffer
    fn start_tx(&mut self, samples: &SampleBuffer) -> DeviceResult<()>;

    /// Begin capturing `sample_count` components
    fn start_rx(&mut self, sample_count: usize) -> DeviceResult<()>;

    /// A transfer is still in progress
    fn busy(&self) -> bool;

    /// Finish the current transfer; required after every start
    fn stop_transfer(&mut self) -> DeviceResult<()>;

    /// Take the buffer captured by the last receive
    fn read(&mut self) -> DeviceResult<SampleBuffer>;

    /// Release the device
    fn teardown(&mut self) -> DeviceResult<()>;
}

/// A configured driver with the transfer handshake enforced
pub struct RadioSession<D: RadioDriver> {
    driver: D,
    poll_interval: Duration,
    timeout: Option<Duration>,
    closed: bool,
}

impl<D: RadioDriver> RadioSession<D> {
    /// Configure `driver` and apply gains
    ///
    /// On failure the driver is torn down before the error is returned.
    pub fn open(mut driver: D, config: &RadioConfig) -> Result<Self> {
        let setup = (|| {
            driver.configure(config)?;
            driver.set_transmit_gain(config.tx_gain)?;
            driver.set_receive_gain(config.lna_gain, config.vga_gain)?;
            driver.set_amp_enable(config.amp_enable)
        })();

        if let Err(e) = setup {
            warn!(driver = driver.name(), error = %e, "radio setup failed");
            if let Err(te) = driver.teardown() {
                warn!(error = %te, "teardown after failed setup also failed");
            }
            return Err(e.into());
        }

        info!(
            driver = driver.name(),
            frequency = config.center_frequency,
            sample_rate = config.sample_rate,
            "radio session open"
        );
        Ok(Self {
            driver,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            closed: false,
        })
    }

    /// Builder: set the `busy()` poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Builder: give up on a transfer after `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Underlying driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Underlying driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Transmit a buffer and wait for completion
    pub fn transmit(&mut self, samples: &SampleBuffer) -> Result<()> {
        debug!(entries = samples.len(), "starting transmit");
        self.driver.start_tx(samples)?;
        let waited = self.wait_idle();
        self.driver.stop_transfer()?;
        waited?;
        Ok(())
    }

    /// Transmit `count` back-to-back copies of a buffer
    pub fn transmit_repeated(&mut self, samples: &SampleBuffer, count: usize) -> Result<()> {
        self.transmit(&samples.repeat(count))
    }

    /// Capture `sample_count` components
    pub fn receive(&mut self, sample_count: usize) -> Result<SampleBuffer> {
        debug!(sample_count, "starting receive");
        self.driver.start_rx(sample_count)?;
        let waited = self.wait_idle();
        self.driver.stop_transfer()?;
        waited?;
        Ok(self.driver.read()?)
    }

    /// Tear the driver down and consume the session
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        info!(driver = self.driver.name(), "radio session closed");
        self.driver.teardown()?;
        Ok(())
    }

    fn wait_idle(&self) -> DeviceResult<()> {
        let start = Instant::now();
        while self.driver.busy() {
            if let Some(timeout) = self.timeout {
                if start.elapsed() >= timeout {
                    return Err(DeviceError::Transfer(format!(
                        "transfer still busy after {timeout:?}"
                    )));
                }
            }
            thread::sleep(self.poll_interval);
        }
        Ok(())
    }
}

impl<D: RadioDriver> Drop for RadioSession<D> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.driver.teardown() {
                warn!(driver = self.driver.name(), error = %e, "teardown on drop failed");
            }
        }
    }
}
