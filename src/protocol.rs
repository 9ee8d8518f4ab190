//! SSD1681 command protocol
//!
//! Everything that speaks the controller's register set lives here: RAM
//! addressing, the reset handshake, the init sequence, the busy wait, soft
//! start tuning and deep sleep. The framebuffer and the refresh strategies
//! sit one level up and only see the methods below.

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::cmd::Cmd;
use crate::config::{BusyWait, Wiring};
use crate::error::{DisplayError, Error};
use crate::flag::Flag;
use crate::interface::{Mode, Transport};
use crate::{HEIGHT, WIDTH};

const RESET_DELAY_MS: u32 = 10;

/// How a wait for the busy line ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// The line dropped (or could not be read, which counts as ready)
    Ready,
    /// The poll budget ran out and the caller proceeds anyway
    TimedOut,
}

/// Booster drive strength, 0 (weakest) to 7
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DriveStrength(u8);

impl DriveStrength {
    /// Weakest setting
    pub const MIN: DriveStrength = DriveStrength(0);
    /// Strongest setting
    pub const MAX: DriveStrength = DriveStrength(7);

    /// Strength level `level`, 0..=7
    pub fn new(level: u8) -> Result<Self, Error> {
        if level > 7 {
            return Err(Error::InvalidArgument);
        }
        Ok(DriveStrength(level))
    }

    /// Raw level
    pub fn level(self) -> u8 {
        self.0
    }
}

/// Duration of each soft start phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum SoftStartTime {
    Ms10 = 0,
    Ms20 = 1,
    Ms30 = 2,
    Ms40 = 3,
}

/// Minimum off time of the booster switch, in µs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum MinOffTime {
    Us2_6 = 0b0100,
    Us3_2 = 0b0101,
    Us3_9 = 0b0110,
    Us4_6 = 0b0111,
    Us5_4 = 0b1000,
    Us6_3 = 0b1001,
    Us7_3 = 0b1010,
    Us8_4 = 0b1011,
    Us9_8 = 0b1100,
    Us11_5 = 0b1101,
    Us13_8 = 0b1110,
    Us16_5 = 0b1111,
}

/// Register-level access to one panel
pub struct Controller<DI, RST, BSY, DELAY> {
    pub(crate) interface: DI,
    rst: RST,
    /// High while the panel is busy
    busy: BSY,
    delay: DELAY,
    busy_wait: BusyWait,
}

impl<DI, RST, BSY, DELAY> Controller<DI, RST, BSY, DELAY> {
    /// Bundle a transport with the reset, busy and timing resources
    pub fn new(interface: DI, rst: RST, busy: BSY, delay: DELAY, busy_wait: BusyWait) -> Self {
        Self {
            interface,
            rst,
            busy,
            delay,
            busy_wait,
        }
    }

    /// Take the controller apart again
    pub fn release(self) -> (DI, RST, BSY, DELAY) {
        (self.interface, self.rst, self.busy, self.delay)
    }
}

impl<DI, RST, BSY, DELAY> Controller<DI, RST, BSY, DELAY>
where
    DI: Transport,
    RST: OutputPin,
    BSY: InputPin,
    DELAY: DelayNs,
{
    /// Send one opcode
    pub(crate) fn cmd(&mut self, command: u8) -> Result<(), Error> {
        self.interface.write_byte(Mode::Command, command)
    }

    /// Send command parameters or RAM data
    pub(crate) fn data(&mut self, data: &[u8]) -> Result<(), Error> {
        self.interface.write_bytes(Mode::Data, data)
    }

    /// Send an opcode followed by its parameters
    pub(crate) fn cmd_with_data(&mut self, command: u8, data: &[u8]) -> Result<(), Error> {
        self.cmd(command)?;
        self.data(data)
    }

    /// Send the same data byte `repetitions` times
    pub(crate) fn data_x_times(&mut self, val: u8, repetitions: usize) -> Result<(), Error> {
        self.interface.write_repeated(Mode::Data, val, repetitions)
    }

    /// Program the RAM address window, bounds inclusive and in pixels
    ///
    /// X is addressed in 8-pixel columns, Y in rows as 16-bit little endian.
    pub fn set_window(
        &mut self,
        x_start: u16,
        y_start: u16,
        x_end: u16,
        y_end: u16,
    ) -> Result<(), Error> {
        log::debug!(
            "RAM window x {}..={} y {}..={}",
            x_start,
            x_end,
            y_start,
            y_end
        );
        self.cmd_with_data(
            Cmd::SET_RAMX_START_END,
            &[(x_start / 8) as u8, (x_end / 8) as u8],
        )?;
        let [ys_lo, ys_hi] = y_start.to_le_bytes();
        let [ye_lo, ye_hi] = y_end.to_le_bytes();
        self.cmd_with_data(Cmd::SET_RAMY_START_END, &[ys_lo, ys_hi, ye_lo, ye_hi])
    }

    /// Move the RAM address counter to pixel (`x`, `y`)
    pub fn set_cursor(&mut self, x: u16, y: u16) -> Result<(), Error> {
        log::debug!("RAM cursor ({}, {})", x, y);
        self.cmd_with_data(Cmd::SET_RAMX_COUNTER, &[(x / 8) as u8])?;
        self.cmd_with_data(Cmd::SET_RAMY_COUNTER, &y.to_le_bytes())
    }

    /// Pulse the reset line: high, low, high, each level held 10 ms
    pub fn hardware_reset(&mut self) -> Result<(), Error> {
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        self.rst.set_low().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        Ok(())
    }

    /// Hardware pulse followed by a software reset, each chased by a busy wait
    pub fn reset(&mut self) -> Result<(), Error> {
        self.hardware_reset()?;
        self.delay.delay_ms(RESET_DELAY_MS);
        self.wait_until_idle();

        self.cmd(Cmd::SW_RESET)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        self.wait_until_idle();
        Ok(())
    }

    /// Reset the panel and load the register set this driver relies on
    ///
    /// Does not activate the panel; that is left to the first update.
    pub fn init(&mut self) -> Result<(), Error> {
        log::info!("Initializing SSD1681 panel");
        self.reset()?;

        self.cmd_with_data(
            Cmd::DRIVER_OUTPUT_CTRL,
            &[
                Flag::DRIVER_OUTPUT_MUX_LOW,
                Flag::DRIVER_OUTPUT_MUX_HIGH,
                Flag::DRIVER_OUTPUT_GATE_SCAN,
            ],
        )?;
        self.cmd_with_data(Cmd::DATA_ENTRY_MODE, &[Flag::DATA_ENTRY_DECRY_INCRX])?;
        self.set_full_window()?;
        self.cmd_with_data(
            Cmd::BORDER_WAVEFORM_CTRL,
            &[Flag::BORDER_WAVEFORM_FOLLOW_LUT1],
        )?;
        self.cmd_with_data(Cmd::TEMP_CONTROL, &[Flag::INTERNAL_TEMP_SENSOR])?;

        self.wait_until_idle();
        Ok(())
    }

    /// Window covering the whole panel
    pub(crate) fn set_full_window(&mut self) -> Result<(), Error> {
        self.set_window(0, 0, WIDTH - 1, HEIGHT - 1)
    }

    /// Write a whole plane to controller RAM through `ram_cmd`
    pub(crate) fn write_ram(&mut self, ram_cmd: u8, buffer: &[u8]) -> Result<(), Error> {
        self.set_full_window()?;
        self.set_cursor(0, 0)?;
        self.cmd(ram_cmd)?;
        self.data(buffer)?;
        log::debug!("wrote {} bytes to RAM 0x{:02X}", buffer.len(), ram_cmd);
        Ok(())
    }

    /// Load update control 1 and 2, then trigger master activation
    ///
    /// Returns as soon as the activation command is out; the refresh itself
    /// runs on the panel with the busy line high.
    pub(crate) fn activate(&mut self, display_mode: u8) -> Result<(), Error> {
        self.cmd_with_data(
            Cmd::DISPLAY_UPDATE_CTRL1,
            &Flag::DISPLAY_UPDATE_CTRL1_NORMAL,
        )?;
        self.cmd_with_data(Cmd::DISPLAY_UPDATE_CTRL2, &[display_mode])?;
        self.cmd(Cmd::MASTER_ACTIVATE)?;
        log::info!("Master activation, update mode 0x{:02X}", display_mode);
        Ok(())
    }

    /// Sample the busy line once; an unreadable line counts as idle
    pub fn is_busy(&mut self) -> bool {
        match self.busy.is_high() {
            Ok(busy) => busy,
            Err(_) => {
                log::error!("Error reading BUSY pin state - assuming not busy to continue");
                false
            }
        }
    }

    /// Poll the busy line until it drops or the poll budget is spent
    ///
    /// Never fails: on timeout a warning is logged and the caller carries on
    /// as if the panel were ready. A short settle delay follows either way.
    pub fn wait_until_idle(&mut self) -> Readiness {
        let BusyWait {
            poll_interval_us,
            max_polls,
            settle_us,
        } = self.busy_wait;

        let mut outcome = Readiness::TimedOut;
        for _ in 0..max_polls {
            match self.busy.is_high() {
                Ok(true) => self.delay.delay_us(poll_interval_us),
                Ok(false) => {
                    outcome = Readiness::Ready;
                    break;
                }
                Err(_) => {
                    log::error!("Error reading BUSY pin state - assuming not busy to continue");
                    outcome = Readiness::Ready;
                    break;
                }
            }
        }

        if outcome == Readiness::TimedOut {
            log::warn!(
                "TIMEOUT waiting for BUSY pin to go LOW after {} polls, proceeding",
                max_polls
            );
        }
        self.delay.delay_us(settle_us);
        outcome
    }

    /// Tune the booster soft start
    pub fn set_soft_start(
        &mut self,
        strength: DriveStrength,
        time: SoftStartTime,
        min_off: MinOffTime,
    ) -> Result<(), Error> {
        let phase = (strength.level() << 4) | min_off as u8;
        log::debug!("soft start phase 0x{:02X}, time {:?}", phase, time);
        self.cmd_with_data(Cmd::BOOSTER_SOFT_START, &[phase, phase, phase, time as u8])
    }

    /// Put the controller into deep sleep mode 1; only a hardware reset wakes it
    pub fn deep_sleep(&mut self) -> Result<(), Error> {
        log::info!("Entering deep sleep");
        self.cmd_with_data(Cmd::DEEP_SLEEP_MODE, &[Flag::DEEP_SLEEP_MODE_1])
    }

    /// Read the status bit register
    ///
    /// Needs a bidirectional data line, so 3-wire panels report
    /// [`Error::NotSupported`] without touching the bus.
    pub fn read_status(&mut self) -> Result<u8, Error> {
        if self.interface.wiring() == Wiring::ThreeWire {
            return Err(Error::NotSupported);
        }
        self.cmd(Cmd::STATUS_BIT_READ)?;
        self.interface.read_byte(Mode::Data)
    }
}
