//! Drawing primitives over the framebuffer
//!
//! Nothing here touches the bus: every primitive goes through
//! [`Framebuffer::write_pixel`], so the row inversion and the inverted bit
//! convention apply uniformly. Push the result with a plane write and an
//! update afterwards.

use crate::error::Error;
use crate::font::{Font, FontSize, GLYPH_SIZE};
use crate::framebuffer::{Framebuffer, Plane};
use crate::{HEIGHT, WIDTH};

/// Reject a rectangle that is inverted or leaves the panel
fn check_rect(left: u16, top: u16, right: u16, bottom: u16) -> Result<(), Error> {
    if left >= WIDTH || top >= HEIGHT || right >= WIDTH || bottom >= HEIGHT {
        return Err(Error::InvalidArgument);
    }
    if left > right || top > bottom {
        return Err(Error::InvalidArgument);
    }
    Ok(())
}

/// Set every pixel of the inclusive rectangle to `on`
pub fn fill_rect(
    fb: &mut Framebuffer,
    plane: Plane,
    left: u16,
    top: u16,
    right: u16,
    bottom: u16,
    on: bool,
) -> Result<(), Error> {
    check_rect(left, top, right, bottom)?;
    for y in top..=bottom {
        for x in left..=right {
            fb.write_pixel(plane, x, y, on)?;
        }
    }
    Ok(())
}

/// Copy a packed bitmap into the inclusive rectangle
///
/// `img` is row-major, MSB first, each row padded to a whole byte, and a set
/// bit turns the pixel on.
pub fn draw_picture(
    fb: &mut Framebuffer,
    plane: Plane,
    left: u16,
    top: u16,
    right: u16,
    bottom: u16,
    img: &[u8],
) -> Result<(), Error> {
    check_rect(left, top, right, bottom)?;
    let width = usize::from(right - left + 1);
    let height = usize::from(bottom - top + 1);
    let bytes_per_line = width.div_ceil(8);
    if img.len() < bytes_per_line * height {
        log::error!(
            "bitmap has {} bytes, {}x{} needs {}",
            img.len(),
            width,
            height,
            bytes_per_line * height
        );
        return Err(Error::InvalidArgument);
    }

    for (dy, line) in img.chunks(bytes_per_line).take(height).enumerate() {
        for dx in 0..width {
            let on = line[dx / 8] & (0x80 >> (dx % 8)) != 0;
            fb.write_pixel(plane, left + dx as u16, top + dy as u16, on)?;
        }
    }
    Ok(())
}

/// Render `text` with its top left corner at (`x`, `y`)
///
/// Glyphs are scaled from 8x8 to `size` by nearest neighbour and overwrite
/// their whole cell, background included. The cursor wraps to the left edge
/// when the next glyph would not fit and rendering stops once a line would
/// leave the bottom. Bytes above `0x7F` are skipped and pixels outside the
/// panel are clipped.
#[allow(clippy::too_many_arguments)]
pub fn draw_string(
    fb: &mut Framebuffer,
    plane: Plane,
    font: &Font,
    x: u16,
    y: u16,
    text: &[u8],
    on: bool,
    size: FontSize,
) -> Result<(), Error> {
    let FontSize(size) = size;
    if size == 0 {
        return Err(Error::InvalidArgument);
    }
    let step = u16::from(size);
    let scale = u16::from(GLYPH_SIZE);
    let (mut x, mut y) = (x, y);

    for &c in text {
        if c > 0x7F {
            continue;
        }
        let glyph = &font[usize::from(c)];

        for row in 0..step {
            let bits = glyph[usize::from(row * scale / step)];
            for col in 0..step {
                let ink = bits & (1 << (col * scale / step)) != 0;
                // off-panel pixels are clipped
                let _ = fb.write_pixel(
                    plane,
                    x.saturating_add(col),
                    y.saturating_add(row),
                    ink == on,
                );
            }
        }

        x = x.saturating_add(step);
        if x.saturating_add(step) > WIDTH {
            x = 0;
            y = y.saturating_add(step);
            if y.saturating_add(step) > HEIGHT {
                break;
            }
        }
    }
    Ok(())
}

#[cfg(feature = "graphics")]
pub use target::PlaneTarget;

#[cfg(feature = "graphics")]
mod target {
    use core::convert::Infallible;

    use embedded_graphics::{
        pixelcolor::BinaryColor,
        prelude::{DrawTarget, OriginDimensions, Pixel, Size},
    };

    use crate::framebuffer::{Framebuffer, Plane};
    use crate::{HEIGHT, WIDTH};

    /// One plane of the framebuffer as an `embedded-graphics` draw target
    ///
    /// `BinaryColor::On` is an inked pixel, black or red depending on the
    /// plane. Pixels outside 200×200 are dropped.
    pub struct PlaneTarget<'a> {
        fb: &'a mut Framebuffer,
        plane: Plane,
    }

    impl<'a> PlaneTarget<'a> {
        /// Draw into `plane` of `fb`
        pub fn new(fb: &'a mut Framebuffer, plane: Plane) -> Self {
            Self { fb, plane }
        }
    }

    impl OriginDimensions for PlaneTarget<'_> {
        fn size(&self) -> Size {
            Size::new(u32::from(WIDTH), u32::from(HEIGHT))
        }
    }

    impl DrawTarget for PlaneTarget<'_> {
        type Color = BinaryColor;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                let (Ok(x), Ok(y)) = (u16::try_from(point.x), u16::try_from(point.y)) else {
                    continue;
                };
                // out of range pixels are skipped, not an error
                let _ = self.fb.write_pixel(self.plane, x, y, color.is_on());
            }
            Ok(())
        }
    }
}
