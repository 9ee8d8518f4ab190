//! SSD1681 Display Driver Implementation
//!
//! [`Ssd1681`] owns everything belonging to one panel: the transport, the
//! reset/busy lines, the delay source, both framebuffer planes and the update
//! sequencer. Create one per physical display.
//!
//! ## Lifecycle
//!
//! - [`Ssd1681::new`] checks the configuration and takes the resources
//! - [`Ssd1681::init`] brings the bus up, resets the panel and clears both planes
//! - drawing calls mutate the framebuffer only
//! - [`Ssd1681::write_buffer`] and [`Ssd1681::update`] (or the combined
//!   [`Ssd1681::write_buffer_and_update_if_ready`]) move pixels to the glass
//! - [`Ssd1681::deinit`] puts the panel into deep sleep and stops the bus
//!
//! Every operation other than `init` fails with [`Error::NotInitialized`]
//! outside of that window.
//!
//! ## Busy handling
//!
//! Blocking calls poll the busy line with the [`crate::config::BusyWait`]
//! budget and proceed when it runs out. A refresh started on a panel that
//! never dropped busy may come out corrupted; the alternative is a firmware
//! stuck forever on a disconnected panel.

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::config::DisplayConfig;
use crate::error::Error;
use crate::font::{Font, FontSize, FONT_BASIC_8X8};
use crate::framebuffer::{Framebuffer, Plane};
use crate::graphics;
use crate::interface::Transport;
use crate::protocol::{Controller, DriveStrength, MinOffTime, SoftStartTime};
use crate::update::{Sequencer, UpdateState, UpdateType};
use crate::BUFFER_SIZE;

/// SSD1681 E-Paper Display Driver
///
/// ## Type Parameters
///
/// - `DI` - transport, usually [`crate::interface::SpiInterface`]
/// - `RST` - Reset output pin
/// - `BSY` - BUSY input pin (HIGH when display is busy)
/// - `DELAY` - Delay provider for timing
pub struct Ssd1681<DI, RST, BSY, DELAY> {
    config: DisplayConfig,
    ctrl: Controller<DI, RST, BSY, DELAY>,
    framebuffer: Framebuffer,
    sequencer: Sequencer,
    font: &'static Font,
    initialized: bool,
}

impl<DI, RST, BSY, DELAY> Ssd1681<DI, RST, BSY, DELAY>
where
    DI: Transport,
    RST: OutputPin,
    BSY: InputPin,
    DELAY: DelayNs,
{
    /// Take the panel resources without touching the hardware
    ///
    /// Fails with [`Error::InvalidArgument`] when `config` is inconsistent or
    /// names a different wiring or clock than `interface` was built with.
    pub fn new(
        config: DisplayConfig,
        interface: DI,
        rst: RST,
        busy: BSY,
        delay: DELAY,
    ) -> Result<Self, Error> {
        config.validate()?;
        if interface.wiring() != config.wiring {
            log::error!(
                "config asks for {:?} but the transport is {:?}",
                config.wiring,
                interface.wiring()
            );
            return Err(Error::InvalidArgument);
        }
        if interface.baudrate() != config.baudrate {
            log::error!(
                "config asks for {} Hz but the transport requests {} Hz",
                config.baudrate,
                interface.baudrate()
            );
            return Err(Error::InvalidArgument);
        }

        Ok(Self {
            config,
            ctrl: Controller::new(interface, rst, busy, delay, config.busy_wait),
            framebuffer: Framebuffer::new(),
            sequencer: Sequencer::default(),
            font: &FONT_BASIC_8X8,
            initialized: false,
        })
    }

    /// Bring up the bus, reset and configure the panel, clear both planes
    ///
    /// Nothing is shown until the first update.
    pub fn init(&mut self) -> Result<(), Error> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }

        let pins = &self.config.pins;
        log::info!(
            "SSD1681 {:?} on {:?}: MOSI {} SCK {} CS {} DC {:?} RST {} BUSY {} @ {} Hz",
            self.config.wiring,
            self.config.bus,
            pins.mosi,
            pins.sck,
            pins.cs,
            pins.dc,
            pins.rst,
            pins.busy,
            self.config.baudrate
        );

        self.ctrl.interface.enable()?;
        if let Err(e) = self.ctrl.init() {
            log::error!("panel init failed: {}", e);
            self.ctrl.interface.disable();
            return Err(e);
        }

        self.framebuffer.clear(Plane::Black);
        self.framebuffer.clear(Plane::Red);
        self.sequencer = Sequencer::default();
        self.initialized = true;
        log::info!("SSD1681 initialized");
        Ok(())
    }

    /// Send the panel to deep sleep and stop the bus
    ///
    /// Does nothing on a driver that is not initialized. The driver counts as
    /// uninitialized afterwards even when the sleep command failed.
    pub fn deinit(&mut self) -> Result<(), Error> {
        if !self.initialized {
            return Ok(());
        }
        let result = self.ctrl.deep_sleep();
        self.ctrl.interface.disable();
        self.initialized = false;
        log::info!("SSD1681 deinitialized");
        result
    }

    /// Whether `init` succeeded and `deinit` has not run since
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Configuration the driver was created with
    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    fn ensure_initialized(&self) -> Result<(), Error> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Turn every pixel of `plane` off. Framebuffer only.
    pub fn clear(&mut self, plane: Plane) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.framebuffer.clear(plane);
        Ok(())
    }

    /// Wait for the panel and copy `plane` into its RAM
    pub fn write_buffer(&mut self, plane: Plane) -> Result<(), Error> {
        self.ensure_initialized()?;
        let buffer = self.framebuffer.plane(plane);
        self.sequencer.write_buffer(&mut self.ctrl, plane, buffer)
    }

    /// Set pixel (`x`, `y`) of `plane`
    pub fn write_point(&mut self, plane: Plane, x: u16, y: u16, on: bool) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.framebuffer.write_pixel(plane, x, y, on)
    }

    /// Read pixel (`x`, `y`) of `plane` back from the framebuffer
    pub fn read_point(&self, plane: Plane, x: u16, y: u16) -> Result<bool, Error> {
        self.ensure_initialized()?;
        self.framebuffer.read_pixel(plane, x, y)
    }

    /// Render ASCII `text` at (`x`, `y`) with the current font
    ///
    /// See [`graphics::draw_string`] for wrapping and clipping.
    pub fn draw_string(
        &mut self,
        plane: Plane,
        x: u16,
        y: u16,
        text: &str,
        on: bool,
        size: FontSize,
    ) -> Result<(), Error> {
        self.ensure_initialized()?;
        graphics::draw_string(
            &mut self.framebuffer,
            plane,
            self.font,
            x,
            y,
            text.as_bytes(),
            on,
            size,
        )
    }

    /// Fill the inclusive rectangle
    pub fn fill_rect(
        &mut self,
        plane: Plane,
        left: u16,
        top: u16,
        right: u16,
        bottom: u16,
        on: bool,
    ) -> Result<(), Error> {
        self.ensure_initialized()?;
        graphics::fill_rect(&mut self.framebuffer, plane, left, top, right, bottom, on)
    }

    /// Blit a packed MSB-first bitmap into the inclusive rectangle
    pub fn draw_picture(
        &mut self,
        plane: Plane,
        left: u16,
        top: u16,
        right: u16,
        bottom: u16,
        img: &[u8],
    ) -> Result<(), Error> {
        self.ensure_initialized()?;
        graphics::draw_picture(&mut self.framebuffer, plane, left, top, right, bottom, img)
    }

    /// Replace the glyph table used by [`Ssd1681::draw_string`]
    pub fn set_font(&mut self, font: &'static Font) {
        self.font = font;
    }

    /// Tune the booster soft start; independent of any refresh
    pub fn set_soft_start(
        &mut self,
        strength: DriveStrength,
        time: SoftStartTime,
        min_off: MinOffTime,
    ) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.ctrl.set_soft_start(strength, time, min_off)
    }

    /// Refresh the panel from its RAM, blocking until it is ready to start
    ///
    /// Returns once activation is triggered. [`UpdateType::FastFull`] is only
    /// available through [`Ssd1681::write_buffer_and_update_if_ready`].
    pub fn update(&mut self, kind: UpdateType) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.sequencer.update(&mut self.ctrl, kind)
    }

    /// Push the black plane and refresh, or return [`Error::Busy`] at once
    ///
    /// The red plane is not pushed; call `write_buffer(Plane::Red)` first
    /// when red content changed.
    pub fn write_buffer_and_update_if_ready(&mut self, kind: UpdateType) -> Result<(), Error> {
        self.ensure_initialized()?;
        let black = self.framebuffer.plane(Plane::Black);
        self.sequencer
            .write_and_update_if_ready(&mut self.ctrl, black, kind)
    }

    /// Sample the busy line once
    pub fn is_busy(&mut self) -> Result<bool, Error> {
        self.ensure_initialized()?;
        Ok(self.ctrl.is_busy())
    }

    /// Read the controller status register (4-wire only)
    pub fn read_status(&mut self) -> Result<u8, Error> {
        self.ensure_initialized()?;
        self.ctrl.read_status()
    }

    /// Where the update sequencer stands
    pub fn update_state(&self) -> UpdateState {
        self.sequencer.state()
    }

    /// Raw bytes of `plane` in panel RAM order
    pub fn buffer(&self, plane: Plane) -> &[u8; BUFFER_SIZE] {
        self.framebuffer.plane(plane)
    }

    /// `embedded-graphics` view of one plane
    #[cfg(feature = "graphics")]
    pub fn plane_target(&mut self, plane: Plane) -> Result<graphics::PlaneTarget<'_>, Error> {
        self.ensure_initialized()?;
        Ok(graphics::PlaneTarget::new(&mut self.framebuffer, plane))
    }

    /// Give the resources back, leaving the panel as it is
    pub fn release(self) -> (DI, RST, BSY, DELAY) {
        self.ctrl.release()
    }
}
