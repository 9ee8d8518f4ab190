//! Refresh strategies and the sequencer that drives them
//!
//! A refresh walks `Idle -> WaitingReady -> Transmitting -> Activating ->
//! Idle`. Only the black plane is pushed by the combined helper; red content
//! has to be written with an explicit plane write before the update.

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::cmd::Cmd;
use crate::error::Error;
use crate::flag::Flag;
use crate::framebuffer::Plane;
use crate::interface::Transport;
use crate::protocol::Controller;
use crate::BUFFER_SIZE;

/// How the panel refreshes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum UpdateType {
    /// Partial waveform, only changed pixels move. Immediate, ghosting likely.
    FastPartial = 0b00,
    /// Full clean waveform, roughly 4 s with minimal ghosting
    CleanFull = 0b01,
    /// Flash everything off with the partial waveform, then draw. Only
    /// available through the combined write-and-update call.
    FastFull = 0b10,
    /// Two clean cycles back to back for zero ghosting at twice the latency
    CleanFullAggressive = 0b11,
}

impl TryFrom<u8> for UpdateType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b00 => Ok(UpdateType::FastPartial),
            0b01 => Ok(UpdateType::CleanFull),
            0b10 => Ok(UpdateType::FastFull),
            0b11 => Ok(UpdateType::CleanFullAggressive),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// Where the sequencer is in a refresh
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpdateState {
    /// Nothing in flight
    #[default]
    Idle,
    /// Polling the busy line
    WaitingReady,
    /// Streaming a plane into panel RAM
    Transmitting,
    /// Loading update control and triggering master activation
    Activating,
}

/// RAM write opcode of `plane`
pub(crate) fn ram_command(plane: Plane) -> u8 {
    match plane {
        Plane::Black => Cmd::WRITE_BW_DATA,
        Plane::Red => Cmd::WRITE_RED_DATA,
    }
}

/// Refresh state machine
#[derive(Debug, Default)]
pub struct Sequencer {
    state: UpdateState,
}

impl Sequencer {
    /// Current state; `Idle` between calls
    pub fn state(&self) -> UpdateState {
        self.state
    }

    fn enter(&mut self, state: UpdateState) {
        if self.state != state {
            log::debug!("update state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Run `step` and fall back to `Idle` whatever it returned
    fn run<C, F>(&mut self, ctrl: &mut C, step: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Self, &mut C) -> Result<(), Error>,
    {
        let result = step(self, ctrl);
        self.enter(UpdateState::Idle);
        result
    }

    /// Wait for the panel, then push `buffer` into the RAM of `plane`
    pub fn write_buffer<DI, RST, BSY, DELAY>(
        &mut self,
        ctrl: &mut Controller<DI, RST, BSY, DELAY>,
        plane: Plane,
        buffer: &[u8; BUFFER_SIZE],
    ) -> Result<(), Error>
    where
        DI: Transport,
        RST: OutputPin,
        BSY: InputPin,
        DELAY: DelayNs,
    {
        self.run(ctrl, |seq, ctrl| seq.transmit(ctrl, plane, buffer))
    }

    /// Blocking refresh of whatever already sits in panel RAM
    ///
    /// `FastFull` needs a RAM flash first and is refused here with
    /// [`Error::NotSupported`].
    pub fn update<DI, RST, BSY, DELAY>(
        &mut self,
        ctrl: &mut Controller<DI, RST, BSY, DELAY>,
        kind: UpdateType,
    ) -> Result<(), Error>
    where
        DI: Transport,
        RST: OutputPin,
        BSY: InputPin,
        DELAY: DelayNs,
    {
        if kind == UpdateType::FastFull {
            log::warn!("FastFull needs the combined write-and-update call");
            return Err(Error::NotSupported);
        }
        self.run(ctrl, |seq, ctrl| {
            seq.wait_ready(ctrl);
            seq.activate(ctrl, kind)
        })
    }

    /// Push the black plane and refresh, unless the panel is busy
    ///
    /// Samples the busy line once; when it is high nothing is sent and
    /// [`Error::Busy`] comes back so a polling caller can try again later.
    pub fn write_and_update_if_ready<DI, RST, BSY, DELAY>(
        &mut self,
        ctrl: &mut Controller<DI, RST, BSY, DELAY>,
        black: &[u8; BUFFER_SIZE],
        kind: UpdateType,
    ) -> Result<(), Error>
    where
        DI: Transport,
        RST: OutputPin,
        BSY: InputPin,
        DELAY: DelayNs,
    {
        if ctrl.is_busy() {
            log::debug!("panel busy, skipping {:?} update", kind);
            return Err(Error::Busy);
        }
        self.run(ctrl, |seq, ctrl| match kind {
            UpdateType::FastFull => {
                // flash pass: RAM straight to white, bypassing the framebuffer
                seq.enter(UpdateState::Transmitting);
                ctrl.cmd(Cmd::WRITE_BW_DATA)?;
                ctrl.data_x_times(Flag::RAM_ALL_WHITE, BUFFER_SIZE)?;
                seq.enter(UpdateState::Activating);
                ctrl.activate(Flag::DISPLAY_MODE_PARTIAL)?;
                seq.wait_ready(ctrl);

                seq.transmit(ctrl, Plane::Black, black)?;
                seq.enter(UpdateState::Activating);
                ctrl.activate(Flag::DISPLAY_MODE_PARTIAL)
            }
            _ => {
                seq.transmit(ctrl, Plane::Black, black)?;
                seq.activate(ctrl, kind)
            }
        })
    }

    fn wait_ready<DI, RST, BSY, DELAY>(&mut self, ctrl: &mut Controller<DI, RST, BSY, DELAY>)
    where
        DI: Transport,
        RST: OutputPin,
        BSY: InputPin,
        DELAY: DelayNs,
    {
        self.enter(UpdateState::WaitingReady);
        ctrl.wait_until_idle();
    }

    fn transmit<DI, RST, BSY, DELAY>(
        &mut self,
        ctrl: &mut Controller<DI, RST, BSY, DELAY>,
        plane: Plane,
        buffer: &[u8; BUFFER_SIZE],
    ) -> Result<(), Error>
    where
        DI: Transport,
        RST: OutputPin,
        BSY: InputPin,
        DELAY: DelayNs,
    {
        self.wait_ready(ctrl);
        self.enter(UpdateState::Transmitting);
        ctrl.write_ram(ram_command(plane), buffer)
    }

    /// Control register sequence for every type but `FastFull`
    fn activate<DI, RST, BSY, DELAY>(
        &mut self,
        ctrl: &mut Controller<DI, RST, BSY, DELAY>,
        kind: UpdateType,
    ) -> Result<(), Error>
    where
        DI: Transport,
        RST: OutputPin,
        BSY: InputPin,
        DELAY: DelayNs,
    {
        self.enter(UpdateState::Activating);
        match kind {
            UpdateType::FastPartial => ctrl.activate(Flag::DISPLAY_MODE_PARTIAL),
            UpdateType::CleanFull => ctrl.activate(Flag::DISPLAY_MODE_CLEAN_FULL),
            UpdateType::CleanFullAggressive => {
                ctrl.activate(Flag::DISPLAY_MODE_CLEAN_FULL)?;
                self.wait_ready(ctrl);
                self.enter(UpdateState::Activating);
                ctrl.activate(Flag::DISPLAY_MODE_CLEAN_FULL)
            }
            UpdateType::FastFull => Err(Error::NotSupported),
        }
    }
}
