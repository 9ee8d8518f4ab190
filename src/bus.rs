//! Serial bus capability the transport is built on
//!
//! The 3-wire mode needs 9-bit frames, which `embedded_hal::spi::SpiBus`
//! cannot express, so the driver asks the board support code for a slightly
//! richer capability: configure a frame width and clock, then shift frames.
//! Frames are always carried in a `u16`, right aligned, MSB first on the wire.

use embedded_hal::spi::SpiBus;

/// Frame layout of the bus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameFormat {
    /// Bits per frame (8 for 4-wire, 9 for 3-wire)
    pub data_bits: u8,
    /// Clock rate in Hz
    pub baudrate: u32,
}

/// An SPI master able to switch frame width and clock at run time
///
/// The bus may be shared with other peripherals between two driver calls, so
/// the transport re-reads [`SerialBus::frame_format`] before every
/// transaction and reconfigures when it differs.
pub trait SerialBus {
    /// Error type for bus operations
    type Error: core::fmt::Debug;

    /// Bring the peripheral up at `baudrate`. Returns the achieved clock,
    /// 0 meaning the peripheral could not be started.
    fn enable(&mut self, baudrate: u32) -> Result<u32, Self::Error>;

    /// Shut the peripheral down
    fn disable(&mut self);

    /// Currently applied frame format
    fn frame_format(&self) -> FrameFormat;

    /// Apply a new frame format
    fn set_frame_format(&mut self, format: FrameFormat) -> Result<(), Self::Error>;

    /// Shift out `frames`, returning how many frames went out
    fn write_frames(&mut self, frames: &[u16]) -> Result<usize, Self::Error>;

    /// Clock in `frames.len()` frames, returning how many were received
    fn read_frames(&mut self, frames: &mut [u16]) -> Result<usize, Self::Error>;

    /// Whether the peripheral can shift frames of `data_bits` bits
    fn supports_frame_width(&self, data_bits: u8) -> bool {
        (4..=16).contains(&data_bits)
    }
}

/// Errors of [`EmbeddedHalBus`]
#[derive(Debug)]
pub enum HalBusError<E> {
    /// The wrapped bus failed
    Spi(E),
    /// Only 8-bit frames can be shifted through `SpiBus<u8>`
    UnsupportedFrameWidth(u8),
}

const CHUNK: usize = 32;

/// Adapter turning any 8-bit `embedded_hal::spi::SpiBus` into a [`SerialBus`]
///
/// Good for 4-wire panels only. The clock is whatever the HAL configured when
/// the bus was built; `enable` reports that rate back as achieved.
pub struct EmbeddedHalBus<SPI> {
    spi: SPI,
    format: FrameFormat,
}

impl<SPI> EmbeddedHalBus<SPI> {
    /// Wrap `spi`, which the HAL already clocks at `clock_hz`
    pub fn new(spi: SPI, clock_hz: u32) -> Self {
        Self {
            spi,
            format: FrameFormat {
                data_bits: 8,
                baudrate: clock_hz,
            },
        }
    }

    /// Give the wrapped bus back
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> SerialBus for EmbeddedHalBus<SPI>
where
    SPI: SpiBus<u8>,
{
    type Error = HalBusError<SPI::Error>;

    fn enable(&mut self, baudrate: u32) -> Result<u32, Self::Error> {
        if baudrate != self.format.baudrate {
            log::debug!(
                "requested {} Hz, HAL bus is fixed at {} Hz",
                baudrate,
                self.format.baudrate
            );
        }
        Ok(self.format.baudrate)
    }

    fn disable(&mut self) {
        if let Err(e) = self.spi.flush() {
            log::error!("SPI flush failed while disabling: {:?}", e);
        }
    }

    fn frame_format(&self) -> FrameFormat {
        self.format
    }

    fn set_frame_format(&mut self, format: FrameFormat) -> Result<(), Self::Error> {
        if format.data_bits != 8 {
            return Err(HalBusError::UnsupportedFrameWidth(format.data_bits));
        }
        // the clock cannot be changed through SpiBus
        if format.baudrate != self.format.baudrate {
            log::warn!(
                "ignoring {} Hz, HAL bus stays at {} Hz",
                format.baudrate,
                self.format.baudrate
            );
        }
        self.format.data_bits = format.data_bits;
        Ok(())
    }

    fn write_frames(&mut self, frames: &[u16]) -> Result<usize, Self::Error> {
        let mut buf = [0u8; CHUNK];
        for chunk in frames.chunks(CHUNK) {
            for (dst, &frame) in buf.iter_mut().zip(chunk) {
                *dst = frame as u8;
            }
            self.spi
                .write(&buf[..chunk.len()])
                .map_err(HalBusError::Spi)?;
        }
        self.spi.flush().map_err(HalBusError::Spi)?;
        Ok(frames.len())
    }

    fn read_frames(&mut self, frames: &mut [u16]) -> Result<usize, Self::Error> {
        let mut buf = [0u8; CHUNK];
        for chunk in frames.chunks_mut(CHUNK) {
            let len = chunk.len();
            self.spi.read(&mut buf[..len]).map_err(HalBusError::Spi)?;
            for (dst, &byte) in chunk.iter_mut().zip(&buf[..len]) {
                *dst = u16::from(byte);
            }
        }
        Ok(frames.len())
    }

    fn supports_frame_width(&self, data_bits: u8) -> bool {
        data_bits == 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::spi::ErrorType;

    #[derive(Default)]
    struct VecSpi {
        written: Vec<u8>,
        to_read: Vec<u8>,
    }

    impl ErrorType for VecSpi {
        type Error = Infallible;
    }

    impl SpiBus<u8> for VecSpi {
        fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            for w in words.iter_mut() {
                *w = self.to_read.remove(0);
            }
            Ok(())
        }
        fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
            self.written.extend_from_slice(words);
            Ok(())
        }
        fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
            self.write(write)?;
            self.read(read)
        }
        fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            self.written.extend_from_slice(words);
            Ok(())
        }
        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn writes_low_byte_of_each_frame_across_chunks() {
        let mut bus = EmbeddedHalBus::new(VecSpi::default(), 1_000_000);
        let frames: Vec<u16> = (0..70u16).map(|i| 0x100 | i).collect();

        assert_eq!(bus.write_frames(&frames).unwrap(), 70);

        let spi = bus.release();
        let expected: Vec<u8> = (0..70u8).collect();
        assert_eq!(spi.written, expected);
    }

    #[test]
    fn reads_bytes_into_frames() {
        let spi = VecSpi {
            to_read: vec![0xAB, 0x01],
            ..Default::default()
        };
        let mut bus = EmbeddedHalBus::new(spi, 1_000_000);
        let mut frames = [0u16; 2];

        assert_eq!(bus.read_frames(&mut frames).unwrap(), 2);
        assert_eq!(frames, [0x00AB, 0x0001]);
    }

    #[test]
    fn refuses_nine_bit_frames() {
        let mut bus = EmbeddedHalBus::new(VecSpi::default(), 1_000_000);

        assert!(!bus.supports_frame_width(9));
        assert!(matches!(
            bus.set_frame_format(FrameFormat {
                data_bits: 9,
                baudrate: 1_000_000
            }),
            Err(HalBusError::UnsupportedFrameWidth(9))
        ));
    }

    #[test]
    fn reports_the_hal_clock_as_achieved() {
        let mut bus = EmbeddedHalBus::new(VecSpi::default(), 8_000_000);
        assert_eq!(bus.enable(4_000_000).unwrap(), 8_000_000);
    }

    #[test]
    fn frame_format_keeps_the_hal_clock() {
        let mut bus = EmbeddedHalBus::new(VecSpi::default(), 8_000_000);

        bus.set_frame_format(FrameFormat {
            data_bits: 8,
            baudrate: 4_000_000,
        })
        .unwrap();

        assert_eq!(
            bus.frame_format(),
            FrameFormat {
                data_bits: 8,
                baudrate: 8_000_000
            }
        );
    }
}
