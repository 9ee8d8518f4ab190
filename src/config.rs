//! Wiring, pin and timing configuration for one SSD1681 panel
//!
//! A [`DisplayConfig`] is handed to [`crate::driver::Ssd1681::new`] and stays
//! immutable for the driver's lifetime. Two presets match the common Pico
//! wiring of the 1.54" module; every field can be overridden afterwards.

use crate::error::Error;

/// Physical serial wiring between the MCU and the controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wiring {
    /// Separate D/C line, 8-bit frames
    FourWire,
    /// No D/C line, the mode bit rides in bit 8 of a 9-bit frame
    ThreeWire,
}

/// Which SPI peripheral the panel hangs off
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusIndex {
    #[allow(missing_docs)]
    Spi0,
    #[allow(missing_docs)]
    Spi1,
}

impl TryFrom<u8> for BusIndex {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BusIndex::Spi0),
            1 => Ok(BusIndex::Spi1),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// GPIO numbers of the display lines
///
/// The pins themselves are handed to the driver as typed HAL objects, these
/// numbers document the wiring and show up in the init log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinAssignment {
    /// SPI data out
    pub mosi: u8,
    /// SPI clock
    pub sck: u8,
    /// Chip select, active low
    pub cs: u8,
    /// Data/Command select (low for command, high for data). `None` in 3-wire mode.
    pub dc: Option<u8>,
    /// Reset, active low
    pub rst: u8,
    /// Busy status, high while the panel is refreshing
    pub busy: u8,
}

/// Tuning of the wait-for-ready poll loop
///
/// The loop reads the busy line every `poll_interval_us` and gives up after
/// `max_polls` reads. Giving up does **not** fail the caller: the driver logs
/// a warning and proceeds as if the panel were ready. A false "ready" can
/// corrupt one refresh, an unbounded wait could wedge the firmware forever.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusyWait {
    /// Delay between two reads of the busy line
    pub poll_interval_us: u32,
    /// Number of reads before proceeding anyway
    pub max_polls: u32,
    /// Extra delay after the line reads ready; the panel briefly reports
    /// ready before it really is
    pub settle_us: u32,
}

impl Default for BusyWait {
    fn default() -> Self {
        Self {
            poll_interval_us: 10,
            max_polls: 1_000_000, // ~10 s
            settle_us: 100,
        }
    }
}

/// Default SPI clock
pub const DEFAULT_BAUDRATE: u32 = 4_000_000;

/// Complete configuration of one panel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayConfig {
    /// 3-wire or 4-wire serial
    pub wiring: Wiring,
    /// SPI peripheral
    pub bus: BusIndex,
    /// GPIO assignment
    pub pins: PinAssignment,
    /// SPI clock in Hz
    pub baudrate: u32,
    /// Wait-for-ready tuning
    pub busy_wait: BusyWait,
}

impl DisplayConfig {
    /// 4-wire preset: SPI0, MOSI 19, SCK 18, CS 17, DC 20, RST 21, BUSY 22, 4 MHz
    pub fn default_4wire() -> Self {
        Self {
            wiring: Wiring::FourWire,
            bus: BusIndex::Spi0,
            pins: PinAssignment {
                mosi: 19,
                sck: 18,
                cs: 17,
                dc: Some(20),
                rst: 21,
                busy: 22,
            },
            baudrate: DEFAULT_BAUDRATE,
            busy_wait: BusyWait::default(),
        }
    }

    /// 3-wire preset: same pins as [`DisplayConfig::default_4wire`] without DC
    pub fn default_3wire() -> Self {
        let mut config = Self::default_4wire();
        config.wiring = Wiring::ThreeWire;
        config.pins.dc = None;
        config
    }

    /// Reject configurations the driver cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.wiring == Wiring::FourWire && self.pins.dc.is_none() {
            log::error!("4-wire wiring requires a D/C pin");
            return Err(Error::InvalidArgument);
        }
        if self.baudrate == 0 || self.busy_wait.max_polls == 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::default_4wire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_only_in_wiring_and_dc() {
        let four = DisplayConfig::default_4wire();
        let three = DisplayConfig::default_3wire();

        assert_eq!(four.wiring, Wiring::FourWire);
        assert_eq!(three.wiring, Wiring::ThreeWire);
        assert_eq!(four.pins.dc, Some(20));
        assert_eq!(three.pins.dc, None);
        assert_eq!(four.baudrate, 4_000_000);
        assert_eq!(four.pins.busy, three.pins.busy);
        assert!(four.validate().is_ok());
        assert!(three.validate().is_ok());
    }

    #[test]
    fn four_wire_without_dc_is_rejected() {
        let mut config = DisplayConfig::default_4wire();
        config.pins.dc = None;
        assert_eq!(config.validate(), Err(Error::InvalidArgument));
    }

    #[test]
    fn zero_baudrate_is_rejected() {
        let mut config = DisplayConfig::default_3wire();
        config.baudrate = 0;
        assert_eq!(config.validate(), Err(Error::InvalidArgument));
    }

    #[test]
    fn zero_poll_budget_is_rejected() {
        let mut config = DisplayConfig::default_4wire();
        config.busy_wait.max_polls = 0;
        assert_eq!(config.validate(), Err(Error::InvalidArgument));
    }

    #[test]
    fn bus_index_only_accepts_zero_and_one() {
        assert_eq!(BusIndex::try_from(0), Ok(BusIndex::Spi0));
        assert_eq!(BusIndex::try_from(1), Ok(BusIndex::Spi1));
        assert_eq!(BusIndex::try_from(2), Err(Error::InvalidArgument));
    }
}
