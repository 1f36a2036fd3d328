//! AD57x4 driver.
//!
//! The AD5724/AD5734/AD5754 are quad, 12/14/16-bit, serial input,
//! voltage output DACs. Each channel has a programmable output range of
//! +5V, +10V, +10.8V, ±5V, ±10V or ±10.8V. The SDO pin of one device can
//! feed the SDIN pin of the next, so any number of devices share one SPI
//! bus, one SYNC line, one CLR line and one LDAC line.
//!
//! Words walk down a chain one 24-bit shift at a time while SYNC is held
//! low: the first word pushed ends up in the device furthest from the
//! controller. Raising SYNC latches every device at once.
//!
//! The SPI bus must be set up by the caller for [`MODE`], MSB first, at no
//! more than [`MAX_FREQUENCY_HZ`].
//!
//! - [AD5724/AD5734/AD5754 product page](https://www.analog.com/en/products/ad5754.html)
//! - [AD5724/AD5734/AD5754 datasheet](https://www.analog.com/media/en/technical-documentation/data-sheets/AD5724_5734_5754.pdf)

#![no_std]
pub(crate) mod fmt;

mod command;
mod error;
pub use command::{Channel, CommandWord, OutputRange};
pub use error::{Error, InvalidArgument, Result};

#[cfg(not(any(feature = "sync", feature = "async")))]
compile_error!("You should probably choose at least one of `sync` and `async` features.");

use embedded_hal::digital::OutputPin;
#[cfg(feature = "sync")]
use embedded_hal::spi::ErrorType;
#[cfg(feature = "sync")]
use embedded_hal::spi::SpiBus;
use embedded_hal::spi::{Mode, MODE_2};
#[cfg(feature = "async")]
use embedded_hal_async::spi::ErrorType as AsyncErrorType;
#[cfg(feature = "async")]
use embedded_hal_async::spi::SpiBus as AsyncSpiBus;

/// SPI mode the input shift register samples in: clock idles high, data
/// latched on the falling edge.
pub const MODE: Mode = MODE_2;

/// Upper bound for the bus clock. The parts accept a faster SCLK; this is
/// half of a 16 MHz controller clock, the rate the chain was brought up at.
pub const MAX_FREQUENCY_HZ: u32 = 8_000_000;

/// Layout of a chain of identically configured devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Config {
    channel_count: u8,
    chain_length: u8,
    range: OutputRange,
}

impl Config {
    /// `channel_count` outputs (1 to 4) are powered on each of the
    /// `chain_length` devices, all spanning `range`.
    pub fn new(
        channel_count: u8,
        chain_length: u8,
        range: OutputRange,
    ) -> core::result::Result<Self, InvalidArgument> {
        if !(1..=4).contains(&channel_count) {
            return Err(InvalidArgument::ChannelCount(channel_count));
        }
        if chain_length == 0 {
            return Err(InvalidArgument::ChainLength);
        }
        Ok(Self {
            channel_count,
            chain_length,
            range,
        })
    }

    /// Same as [`Config::new`], with the range given as its 1 to 6 selector.
    pub fn with_selector(
        channel_count: u8,
        chain_length: u8,
        range: u8,
    ) -> core::result::Result<Self, InvalidArgument> {
        Self::new(channel_count, chain_length, OutputRange::try_from(range)?)
    }

    pub fn channel_count(&self) -> u8 {
        self.channel_count
    }

    pub fn chain_length(&self) -> u8 {
        self.chain_length
    }

    pub fn range(&self) -> OutputRange {
        self.range
    }

    /// Range programmed into every channel by `configure`.
    fn hardware_range(&self) -> OutputRange {
        // FIXME: the range register ignores the configured range and is
        // always set to ±10V. Enable `configured-range` to program `range`.
        if cfg!(feature = "configured-range") {
            self.range
        } else {
            OutputRange::Bipolar10V
        }
    }
}

/// A daisy chain of AD57x4 DACs on the SPI bus `SPI`, with SYNC, CLR and
/// LDAC lines.
#[maybe_async_cfg::maybe(
    sync(feature = "sync", self = "Ad57x4"),
    async(feature = "async", keep_self)
)]
pub struct AsyncAd57x4<SPI, SYNC, CLR, LDAC> {
    spi: SPI,
    sync: SYNC,
    clear: CLR,
    load: LDAC,
    config: Config,
}

#[maybe_async_cfg::maybe(
    sync(
        feature = "sync",
        self = "Ad57x4",
        idents(AsyncSpiBus(sync = "SpiBus"), AsyncErrorType(sync = "ErrorType"))
    ),
    async(feature = "async", keep_self)
)]
impl<SPI, SYNC, CLR, LDAC, P> AsyncAd57x4<SPI, SYNC, CLR, LDAC>
where
    SPI: AsyncSpiBus + AsyncErrorType,
    SYNC: OutputPin<Error = P>,
    CLR: OutputPin<Error = P>,
    LDAC: OutputPin<Error = P>,
{
    /// Take over the bus and control lines, reset the chain and bring it up.
    ///
    /// SYNC and LDAC are left idle high and CLR is pulsed, then every device
    /// is configured and powered.
    pub async fn new(
        spi: SPI,
        sync: SYNC,
        clear: CLR,
        load: LDAC,
        config: Config,
    ) -> Result<Self, SPI::Error, P> {
        trace!("new");

        let mut dac = Self {
            spi,
            sync,
            clear,
            load,
            config,
        };
        dac.sync.set_high().map_err(Error::Pin)?;
        dac.clear.set_low().map_err(Error::Pin)?;
        dac.clear.set_high().map_err(Error::Pin)?;
        dac.load.set_high().map_err(Error::Pin)?;

        dac.configure().await?;
        dac.power_up().await?;
        Ok(dac)
    }

    /// Program the control register, then the output range of each channel,
    /// on every device.
    pub async fn configure(&mut self) -> Result<(), SPI::Error, P> {
        trace!("configure");

        self.broadcast(CommandWord::control(CommandWord::STARTUP_CONTROL))
            .await?;

        let range = self.config.hardware_range();
        for channel in Channel::EACH {
            self.broadcast(CommandWord::range_select(channel, range))
                .await?;
        }
        Ok(())
    }

    /// Power up the first `channel_count` outputs of every device. Outputs
    /// stay at high impedance until this is done.
    pub async fn power_up(&mut self) -> Result<(), SPI::Error, P> {
        trace!("power_up");

        self.broadcast(CommandWord::power_up(self.config.channel_count))
            .await
    }

    /// Shift a new `voltage` for `channel` into the first device of the
    /// chain, pushing every word already in the chain one device further.
    ///
    /// SYNC is left low: push one word per device, then [`synchronize`]
    /// (or [`load_all`]) to latch them together.
    ///
    /// [`synchronize`]: Self::synchronize
    /// [`load_all`]: Self::load_all
    pub async fn push_voltage(
        &mut self,
        voltage: f32,
        channel: Channel,
    ) -> Result<(), SPI::Error, P> {
        trace!("push_voltage");

        let range = self.config.range;
        let clamped = range.clamp(voltage);
        if clamped != voltage {
            warn!("{}V clamped to {}V", voltage, clamped);
        }
        self.transmit(CommandWord::voltage(channel, range, clamped))
            .await
    }

    /// Same as [`push_voltage`](Self::push_voltage), with channels numbered
    /// 1 (A) to 4 (D) and 5 for all.
    pub async fn push_voltage_to(
        &mut self,
        voltage: f32,
        channel: u8,
    ) -> Result<(), SPI::Error, P> {
        let channel = Channel::try_from(channel)?;
        self.push_voltage(voltage, channel).await
    }

    /// Load every device's DAC registers from its input registers, pulsing
    /// LDAC around the latch so the whole chain updates at once.
    pub async fn load_all(&mut self) -> Result<(), SPI::Error, P> {
        trace!("load_all");

        self.push_to_each(CommandWord::load()).await?;
        self.load.set_low().map_err(Error::Pin)?;
        self.synchronize().await?;
        self.load.set_high().map_err(Error::Pin)
    }

    /// Set every channel of every device to its clear code.
    pub async fn clear_all(&mut self) -> Result<(), SPI::Error, P> {
        trace!("clear_all");

        self.broadcast(CommandWord::clear()).await
    }

    /// Pull SYNC low and clock `word` into the first device. SYNC stays low.
    pub async fn transmit(&mut self, word: CommandWord) -> Result<(), SPI::Error, P> {
        debug!("W 0x{:x}", u32::from(word));

        self.sync.set_low().map_err(Error::Pin)?;
        self.spi
            .write(&word.to_bytes())
            .await
            .map_err(Error::Spi)
    }

    /// Raise SYNC, latching whatever was shifted in since it went low.
    pub async fn synchronize(&mut self) -> Result<(), SPI::Error, P> {
        self.spi.flush().await.map_err(Error::Spi)?;
        self.sync.set_high().map_err(Error::Pin)
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Return the underlying SPI bus and SYNC, CLR and LDAC pins
    pub fn release(self) -> (SPI, SYNC, CLR, LDAC) {
        (self.spi, self.sync, self.clear, self.load)
    }

    /// Send `word` once per device, leaving SYNC low.
    async fn push_to_each(&mut self, word: CommandWord) -> Result<(), SPI::Error, P> {
        for _ in 0..self.config.chain_length {
            self.transmit(word).await?;
        }
        Ok(())
    }

    /// Send `word` to every device and latch it.
    async fn broadcast(&mut self, word: CommandWord) -> Result<(), SPI::Error, P> {
        self.push_to_each(word).await?;
        self.synchronize().await
    }
}
