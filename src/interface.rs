//! Display interface using SPI
//!
//! Turns a logical (command-or-data, byte) pair into bus traffic. Two wirings
//! exist and the upper layers cannot tell them apart:
//!
//! - **4-wire**: the D/C line carries the mode (low for command, high for
//!   data) and every byte is one 8-bit frame.
//! - **3-wire**: there is no D/C line. Each byte becomes a 9-bit frame with the
//!   mode in bit 8, so `0x12` sent as a command is `0x012` and sent as data is
//!   `0x112`. The bus has to run in 9-bit framing for this.
//!
//! Chip select is asserted once per call, whether the call carries one byte or
//! a whole framebuffer.

use core::convert::Infallible;

use display_interface::{DataFormat, WriteOnlyDataCommand};
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::bus::{FrameFormat, SerialBus};
use crate::config::{DisplayConfig, Wiring};
use crate::error::{DisplayError, Error};

/// Whether a byte is a command opcode or a command parameter/RAM data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// D/C low, bit 8 clear
    Command,
    /// D/C high, bit 8 set
    Data,
}

impl Mode {
    fn bit(self) -> u16 {
        match self {
            Mode::Command => 0,
            Mode::Data => 1,
        }
    }
}

/// The byte pipe the command layer talks through
pub trait Transport {
    /// Which physical wiring this transport drives
    fn wiring(&self) -> Wiring;

    /// Clock the transport was built to request, in Hz
    fn baudrate(&self) -> u32;

    /// Start the bus and park the control lines at their idle level
    fn enable(&mut self) -> Result<(), Error>;

    /// Stop the bus
    fn disable(&mut self);

    /// Send one byte
    fn write_byte(&mut self, mode: Mode, value: u8) -> Result<(), Error> {
        self.write_bytes(mode, &[value])
    }

    /// Send a buffer inside a single chip-select window
    fn write_bytes(&mut self, mode: Mode, buf: &[u8]) -> Result<(), Error>;

    /// Send `value` `count` times inside a single chip-select window
    fn write_repeated(&mut self, mode: Mode, value: u8, count: usize) -> Result<(), Error>;

    /// Read one byte
    fn read_byte(&mut self, mode: Mode) -> Result<u8, Error> {
        let mut byte = [0u8];
        self.read_bytes(mode, &mut byte)?;
        Ok(byte[0])
    }

    /// Fill `buf` from the controller
    fn read_bytes(&mut self, mode: Mode, buf: &mut [u8]) -> Result<(), Error>;
}

/// Placeholder for the D/C line of a 3-wire panel
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// How the mode reaches the controller
enum ModeLine<DC> {
    /// 4-wire: a GPIO
    Pin(DC),
    /// 3-wire: the bit put in front of the next frames
    Bit(Mode),
}

const CHUNK: usize = 32;

/// SPI transport for both wirings
pub struct SpiInterface<BUS, CS, DC> {
    /// Serial peripheral
    bus: BUS,
    /// Chip select, driven by hand around each call
    cs: CS,
    mode_line: ModeLine<DC>,
    /// Clock the panel asked for
    baudrate: u32,
    /// Clock the bus came up at; re-applied whenever the shared bus drifted
    clock: u32,
}

impl<BUS, CS, DC> SpiInterface<BUS, CS, DC> {
    /// 4-wire transport with `dc` as the Data/Command line
    pub fn four_wire(bus: BUS, cs: CS, dc: DC, baudrate: u32) -> Self {
        Self {
            bus,
            cs,
            mode_line: ModeLine::Pin(dc),
            baudrate,
            clock: baudrate,
        }
    }

    /// Pick the wiring from `config`. A 4-wire config needs `dc`, a 3-wire
    /// config ignores it.
    pub fn from_config(
        config: &DisplayConfig,
        bus: BUS,
        cs: CS,
        dc: Option<DC>,
    ) -> Result<Self, Error> {
        let mode_line = match (config.wiring, dc) {
            (Wiring::FourWire, Some(dc)) => ModeLine::Pin(dc),
            (Wiring::FourWire, None) => return Err(Error::InvalidArgument),
            (Wiring::ThreeWire, _) => ModeLine::Bit(Mode::Command),
        };
        Ok(Self {
            bus,
            cs,
            mode_line,
            baudrate: config.baudrate,
            clock: config.baudrate,
        })
    }

    /// Mode bit that will tag the next 3-wire frames, `None` on 4-wire
    pub fn mode_bit(&self) -> Option<Mode> {
        match self.mode_line {
            ModeLine::Pin(_) => None,
            ModeLine::Bit(mode) => Some(mode),
        }
    }

    /// Give back the bus and pins
    pub fn release(self) -> (BUS, CS, Option<DC>) {
        let dc = match self.mode_line {
            ModeLine::Pin(dc) => Some(dc),
            ModeLine::Bit(_) => None,
        };
        (self.bus, self.cs, dc)
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut BUS {
        &mut self.bus
    }

    fn frame_bits(&self) -> u8 {
        match self.mode_line {
            ModeLine::Pin(_) => 8,
            ModeLine::Bit(_) => 9,
        }
    }
}

impl<BUS, CS> SpiInterface<BUS, CS, NoPin> {
    /// 3-wire transport, the mode travels as bit 8 of each frame
    pub fn three_wire(bus: BUS, cs: CS, baudrate: u32) -> Self {
        Self {
            bus,
            cs,
            mode_line: ModeLine::Bit(Mode::Command),
            baudrate,
            clock: baudrate,
        }
    }
}

impl<BUS, CS, DC> SpiInterface<BUS, CS, DC>
where
    BUS: SerialBus,
    CS: OutputPin,
    DC: OutputPin,
{
    /// Put the bus back into our frame width and clock if someone else
    /// changed it since the last call
    fn ensure_format(&mut self) -> Result<(), Error> {
        let wanted = FrameFormat {
            data_bits: self.frame_bits(),
            baudrate: self.clock,
        };
        let current = self.bus.frame_format();
        if current != wanted {
            log::debug!(
                "reconfiguring bus: {} bits @ {} Hz -> {} bits @ {} Hz",
                current.data_bits,
                current.baudrate,
                wanted.data_bits,
                wanted.baudrate
            );
            self.bus.set_frame_format(wanted).map_err(|e| {
                log::error!("bus refused frame format: {:?}", e);
                DisplayError::BusWriteError
            })?;
        }
        Ok(())
    }

    fn select(&mut self, mode: Mode) -> Result<(), Error> {
        match &mut self.mode_line {
            ModeLine::Pin(dc) => {
                let result = match mode {
                    // low for commands
                    Mode::Command => dc.set_low(),
                    // high for data
                    Mode::Data => dc.set_high(),
                };
                result.map_err(|_| Error::Transport(DisplayError::DCError))
            }
            ModeLine::Bit(bit) => {
                *bit = mode;
                Ok(())
            }
        }
    }

    /// One chip-select window around `bytes`
    fn transmit<I>(&mut self, mode: Mode, bytes: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = u8>,
    {
        self.ensure_format()?;
        self.select(mode)?;

        self.cs.set_low().map_err(|_| DisplayError::CSError)?;
        let result = self.shift_out(mode, bytes);
        self.cs.set_high().map_err(|_| DisplayError::CSError)?;
        result
    }

    fn shift_out<I>(&mut self, mode: Mode, bytes: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = u8>,
    {
        let tag = match self.mode_line {
            ModeLine::Pin(_) => 0,
            ModeLine::Bit(_) => mode.bit() << 8,
        };

        let mut frames = [0u16; CHUNK];
        let mut bytes = bytes.into_iter().peekable();
        while bytes.peek().is_some() {
            let mut len = 0;
            for (frame, byte) in frames.iter_mut().zip(&mut bytes) {
                *frame = tag | u16::from(byte);
                len += 1;
            }

            let sent = self.bus.write_frames(&frames[..len]).map_err(|e| {
                log::error!("bus write failed: {:?}", e);
                DisplayError::BusWriteError
            })?;
            if sent != len {
                log::error!("short bus write: {} of {} frames", sent, len);
                return Err(Error::Transport(DisplayError::BusWriteError));
            }
        }
        Ok(())
    }

    fn shift_in(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let mut frames = [0u16; CHUNK];
        for chunk in buf.chunks_mut(CHUNK) {
            let len = chunk.len();
            let received = self.bus.read_frames(&mut frames[..len]).map_err(|e| {
                log::error!("bus read failed: {:?}", e);
                DisplayError::BusWriteError
            })?;
            if received != len {
                log::error!("short bus read: {} of {} frames", received, len);
                return Err(Error::Transport(DisplayError::BusWriteError));
            }
            for (dst, &frame) in chunk.iter_mut().zip(&frames[..len]) {
                *dst = frame as u8;
            }
        }
        Ok(())
    }

    fn send_format(&mut self, mode: Mode, format: DataFormat<'_>) -> Result<(), DisplayError> {
        let result = match format {
            DataFormat::U8(bytes) => self.transmit(mode, bytes.iter().copied()),
            DataFormat::U8Iter(iter) => self.transmit(mode, iter),
            _ => return Err(DisplayError::DataFormatNotImplemented),
        };
        result.map_err(|e| match e {
            Error::Transport(kind) => kind,
            _ => DisplayError::BusWriteError,
        })
    }
}

impl<BUS, CS, DC> Transport for SpiInterface<BUS, CS, DC>
where
    BUS: SerialBus,
    CS: OutputPin,
    DC: OutputPin,
{
    fn wiring(&self) -> Wiring {
        match self.mode_line {
            ModeLine::Pin(_) => Wiring::FourWire,
            ModeLine::Bit(_) => Wiring::ThreeWire,
        }
    }

    fn baudrate(&self) -> u32 {
        self.baudrate
    }

    fn enable(&mut self) -> Result<(), Error> {
        let bits = self.frame_bits();
        if !self.bus.supports_frame_width(bits) {
            log::error!("bus cannot shift {}-bit frames", bits);
            return Err(Error::NotSupported);
        }

        let achieved = self.bus.enable(self.baudrate).map_err(|e| {
            log::error!("bus init failed: {:?}", e);
            DisplayError::BusWriteError
        })?;
        log::info!(
            "SPI requested {} Hz, achieved {} Hz",
            self.baudrate,
            achieved
        );
        if achieved == 0 {
            return Err(Error::Transport(DisplayError::BusWriteError));
        }
        self.clock = achieved;

        self.ensure_format()?;
        self.cs.set_high().map_err(|_| DisplayError::CSError)?;
        self.select(Mode::Command)
    }

    fn disable(&mut self) {
        if self.cs.set_high().is_err() {
            log::error!("failed to release CS while disabling the bus");
        }
        self.bus.disable();
    }

    fn write_bytes(&mut self, mode: Mode, buf: &[u8]) -> Result<(), Error> {
        self.transmit(mode, buf.iter().copied())
    }

    fn write_repeated(&mut self, mode: Mode, value: u8, count: usize) -> Result<(), Error> {
        self.transmit(mode, core::iter::repeat(value).take(count))
    }

    fn read_bytes(&mut self, mode: Mode, buf: &mut [u8]) -> Result<(), Error> {
        if let ModeLine::Bit(_) = self.mode_line {
            // the single data line is not turned around in 3-wire mode
            log::warn!("read requested on a 3-wire bus");
            return Err(Error::NotSupported);
        }

        self.ensure_format()?;
        self.select(mode)?;

        self.cs.set_low().map_err(|_| DisplayError::CSError)?;
        let result = self.shift_in(buf);
        self.cs.set_high().map_err(|_| DisplayError::CSError)?;
        result
    }
}

impl<BUS, CS, DC> WriteOnlyDataCommand for SpiInterface<BUS, CS, DC>
where
    BUS: SerialBus,
    CS: OutputPin,
    DC: OutputPin,
{
    fn send_commands(&mut self, cmd: DataFormat<'_>) -> Result<(), DisplayError> {
        self.send_format(Mode::Command, cmd)
    }

    fn send_data(&mut self, buf: DataFormat<'_>) -> Result<(), DisplayError> {
        self.send_format(Mode::Data, buf)
    }
}
