//! SSD1681 ePaper Display Driver
//!
//! For the 1.54" 200x200 black/red modules built around the Solomon Systech
//! SSD1681, wired either as 4-wire SPI (separate D/C line) or as 3-wire SPI
//! where the D/C bit travels as bit 8 of a 9-bit frame.
//!
//! ### Usage
//! The driver keeps one framebuffer per color plane and never draws to the
//! panel directly. To display something you:
//!
//! 1. build a [`config::DisplayConfig`] (or take [`config::DisplayConfig::default_4wire`])
//!    and an [`interface::SpiInterface`] over your bus
//! 1. create the driver with [`driver::Ssd1681::new`] and call [`driver::Ssd1681::init`]
//! 1. draw with the primitives on the driver or, with the `graphics` feature,
//!    with [`embedded_graphics`](https://github.com/embedded-graphics/embedded-graphics)
//!    through [`driver::Ssd1681::plane_target`]
//! 1. push a plane with [`driver::Ssd1681::write_buffer`] and refresh with
//!    [`driver::Ssd1681::update`]
//!
//! Any `embedded_hal::spi::SpiBus<u8>` works for 4-wire panels through
//! [`bus::EmbeddedHalBus`]. 3-wire panels need a [`bus::SerialBus`] able to
//! shift 9-bit frames.
//!
//! The crate logs through the [`log`] facade and leaves choosing a logger to
//! the firmware.
#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]
#![allow(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod bus;
pub mod config;
pub mod driver;
pub mod error;
pub mod font;
pub mod framebuffer;
pub mod graphics;
pub mod interface;
pub mod protocol;
pub mod update;

mod cmd;
mod flag;

#[cfg(test)]
mod mock;

/// Display width, pixels horizontally
pub const WIDTH: u16 = 200;

/// Display height, pixels vertically
pub const HEIGHT: u16 = 200;

/// Bytes per framebuffer row, 8 pixels each
pub const BYTES_PER_ROW: usize = WIDTH as usize / 8;

/// Bytes in one framebuffer plane
pub const BUFFER_SIZE: usize = BYTES_PER_ROW * HEIGHT as usize;

/// The types most callers need
pub mod prelude {
    pub use crate::config::{DisplayConfig, Wiring};
    pub use crate::driver::Ssd1681;
    pub use crate::error::Error;
    pub use crate::font::FontSize;
    pub use crate::framebuffer::Plane;
    pub use crate::interface::{NoPin, SpiInterface};
    pub use crate::update::UpdateType;
}
