//! Local mirror of the two panel RAM planes
//!
//! Pixels are packed 8 per byte, 25 bytes per row, MSB first. The panel's
//! convention is inverted: a set bit is an "off" (white) pixel, so a cleared
//! buffer is all `0xFF`. Rows are stored bottom-up to match the Y-decrement
//! data entry mode the panel is initialized with.

use crate::error::Error;
use crate::{BUFFER_SIZE, BYTES_PER_ROW, HEIGHT, WIDTH};

/// Which of the two bit-planes a call targets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plane {
    /// Black/white RAM, written with opcode `0x24`
    Black,
    /// Red RAM, written with opcode `0x26`
    Red,
}

/// Both planes of one 200×200 panel
pub struct Framebuffer {
    black: [u8; BUFFER_SIZE],
    red: [u8; BUFFER_SIZE],
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framebuffer {
    /// Both planes cleared, every pixel off
    pub const fn new() -> Self {
        Self {
            black: [0xFF; BUFFER_SIZE],
            red: [0xFF; BUFFER_SIZE],
        }
    }

    /// Byte index and bit mask of pixel (`x`, `y`)
    fn locate(x: u16, y: u16) -> Result<(usize, u8), Error> {
        if x >= WIDTH || y >= HEIGHT {
            return Err(Error::InvalidArgument);
        }
        let index = usize::from(HEIGHT - 1 - y) * BYTES_PER_ROW + usize::from(x / 8);
        let mask = 1 << (7 - (x % 8));
        Ok((index, mask))
    }

    /// Turn pixel (`x`, `y`) on or off
    pub fn write_pixel(&mut self, plane: Plane, x: u16, y: u16, on: bool) -> Result<(), Error> {
        let (index, mask) = Self::locate(x, y)?;
        let byte = &mut self.plane_mut(plane)[index];
        if on {
            *byte &= !mask;
        } else {
            *byte |= mask;
        }
        Ok(())
    }

    /// Whether pixel (`x`, `y`) is on
    pub fn read_pixel(&self, plane: Plane, x: u16, y: u16) -> Result<bool, Error> {
        let (index, mask) = Self::locate(x, y)?;
        Ok(self.plane(plane)[index] & mask == 0)
    }

    /// Turn every pixel of `plane` off
    pub fn clear(&mut self, plane: Plane) {
        self.plane_mut(plane).fill(0xFF);
    }

    /// Raw bytes of `plane` in panel RAM order
    pub fn plane(&self, plane: Plane) -> &[u8; BUFFER_SIZE] {
        match plane {
            Plane::Black => &self.black,
            Plane::Red => &self.red,
        }
    }

    fn plane_mut(&mut self, plane: Plane) -> &mut [u8; BUFFER_SIZE] {
        match plane {
            Plane::Black => &mut self.black,
            Plane::Red => &mut self.red,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_every_pixel_off() {
        let fb = Framebuffer::new();
        assert!(fb.plane(Plane::Black).iter().all(|&b| b == 0xFF));
        assert!(fb.plane(Plane::Red).iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn write_then_read_round_trips_everywhere() -> anyhow::Result<()> {
        let mut fb = Framebuffer::new();
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                fb.write_pixel(Plane::Black, x, y, true)?;
                assert!(fb.read_pixel(Plane::Black, x, y)?);
                fb.write_pixel(Plane::Black, x, y, false)?;
                assert!(!fb.read_pixel(Plane::Black, x, y)?);
            }
        }
        Ok(())
    }

    #[test]
    fn on_clears_the_bit_in_the_inverted_row() -> anyhow::Result<()> {
        let mut fb = Framebuffer::new();

        fb.write_pixel(Plane::Black, 0, 0, true)?;
        fb.write_pixel(Plane::Black, 9, 199, true)?;

        let black = fb.plane(Plane::Black);
        // row 0 is the last one in RAM
        assert_eq!(black[199 * 25], 0x7F);
        // x = 9 is bit 6 of the second column
        assert_eq!(black[1], 0xBF);
        assert_eq!(black.iter().filter(|&&b| b != 0xFF).count(), 2);
        Ok(())
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let mut fb = Framebuffer::new();
        assert_eq!(
            fb.write_pixel(Plane::Red, 200, 0, true),
            Err(Error::InvalidArgument)
        );
        assert_eq!(
            fb.write_pixel(Plane::Red, 0, 200, true),
            Err(Error::InvalidArgument)
        );
        assert_eq!(
            fb.read_pixel(Plane::Red, 200, 5),
            Err(Error::InvalidArgument)
        );
        assert_eq!(
            fb.read_pixel(Plane::Red, 5, 250),
            Err(Error::InvalidArgument)
        );
    }

    #[test]
    fn clear_only_touches_its_own_plane() -> anyhow::Result<()> {
        let mut fb = Framebuffer::new();
        fb.write_pixel(Plane::Black, 3, 3, true)?;
        fb.write_pixel(Plane::Red, 4, 4, true)?;

        fb.clear(Plane::Black);

        assert!(fb.plane(Plane::Black).iter().all(|&b| b == 0xFF));
        assert!(fb.read_pixel(Plane::Red, 4, 4)?);
        Ok(())
    }
}
