//! Recording doubles for the bus, pins and delay used by the unit tests.
//!
//! Every double appends to one shared timeline so a test can check ordering
//! across lines, e.g. that D/C settles before chip select drops.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};

use crate::bus::{FrameFormat, SerialBus};
use crate::config::BusyWait;
use crate::interface::{SpiInterface, Transport};
use crate::protocol::Controller;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Enable(u32),
    Disable,
    Format(FrameFormat),
    Frames(Vec<u16>),
    Read(usize),
    Cs(bool),
    Dc(bool),
    Rst(bool),
    BusyRead(bool),
    DelayNs(u64),
}

pub type Timeline = Rc<RefCell<Vec<Event>>>;

pub fn timeline() -> Timeline {
    Rc::new(RefCell::new(Vec::new()))
}

/// All frames shifted out, in order
pub fn frames(events: &[Event]) -> Vec<u16> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Frames(f) => Some(f.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Rebuild `(opcode, parameters)` pairs from the timeline.
///
/// Works for both wirings: 9-bit frames carry the mode in bit 8, 8-bit frames
/// take it from the last D/C level.
pub fn transactions(events: &[Event]) -> Vec<(u8, Vec<u8>)> {
    let mut out: Vec<(u8, Vec<u8>)> = Vec::new();
    let mut dc_high = false;
    let mut nine_bit = false;
    for event in events {
        match event {
            Event::Dc(level) => dc_high = *level,
            Event::Format(f) => nine_bit = f.data_bits == 9,
            Event::Frames(frames) => {
                for &frame in frames {
                    let is_data = if nine_bit {
                        frame & 0x100 != 0
                    } else {
                        dc_high
                    };
                    let byte = frame as u8;
                    if is_data {
                        match out.last_mut() {
                            Some((_, data)) => data.push(byte),
                            None => panic!("data byte {:#04x} before any command", byte),
                        }
                    } else {
                        out.push((byte, Vec::new()));
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Just the opcodes of [`transactions`]
pub fn opcodes(events: &[Event]) -> Vec<u8> {
    transactions(events).into_iter().map(|(c, _)| c).collect()
}

/// Sum of all delays in the timeline, in ns
pub fn delayed_ns(events: &[Event]) -> u64 {
    events
        .iter()
        .map(|e| match e {
            Event::DelayNs(ns) => *ns,
            _ => 0,
        })
        .sum()
}

pub struct MockBus {
    log: Timeline,
    format: FrameFormat,
    achieved: Option<u32>,
    dropped: usize,
    to_read: VecDeque<u16>,
}

impl MockBus {
    pub fn new(log: &Timeline) -> Self {
        Self {
            log: log.clone(),
            format: FrameFormat {
                data_bits: 8,
                baudrate: 0,
            },
            achieved: None,
            dropped: 0,
            to_read: VecDeque::new(),
        }
    }

    /// Report `hz` from `enable` instead of echoing the request
    pub fn achieve(&mut self, hz: u32) {
        self.achieved = Some(hz);
    }

    /// Make every write come back `n` frames short
    pub fn drop_frames(&mut self, n: usize) {
        self.dropped = n;
    }

    /// Simulate another bus user changing the format behind our back
    pub fn force_format(&mut self, format: FrameFormat) {
        self.format = format;
    }

    pub fn queue_read(&mut self, bytes: &[u8]) {
        self.to_read.extend(bytes.iter().map(|&b| u16::from(b)));
    }
}

impl SerialBus for MockBus {
    type Error = Infallible;

    fn enable(&mut self, baudrate: u32) -> Result<u32, Self::Error> {
        let achieved = self.achieved.unwrap_or(baudrate);
        self.log.borrow_mut().push(Event::Enable(achieved));
        Ok(achieved)
    }

    fn disable(&mut self) {
        self.log.borrow_mut().push(Event::Disable);
    }

    fn frame_format(&self) -> FrameFormat {
        self.format
    }

    fn set_frame_format(&mut self, format: FrameFormat) -> Result<(), Self::Error> {
        self.format = format;
        self.log.borrow_mut().push(Event::Format(format));
        Ok(())
    }

    fn write_frames(&mut self, frames: &[u16]) -> Result<usize, Self::Error> {
        self.log.borrow_mut().push(Event::Frames(frames.to_vec()));
        Ok(frames.len().saturating_sub(self.dropped))
    }

    fn read_frames(&mut self, frames: &mut [u16]) -> Result<usize, Self::Error> {
        self.log.borrow_mut().push(Event::Read(frames.len()));
        let mut n = 0;
        for frame in frames.iter_mut() {
            match self.to_read.pop_front() {
                Some(v) => {
                    *frame = v;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pin {
    Cs,
    Dc,
    Rst,
}

pub struct MockPin {
    log: Timeline,
    pin: Pin,
    broken: bool,
}

impl MockPin {
    pub fn new(log: &Timeline, pin: Pin) -> Self {
        Self {
            log: log.clone(),
            pin,
            broken: false,
        }
    }

    pub fn broken(log: &Timeline, pin: Pin) -> Self {
        Self {
            broken: true,
            ..Self::new(log, pin)
        }
    }

    fn drive(&mut self, level: bool) -> Result<(), ErrorKind> {
        if self.broken {
            return Err(ErrorKind::Other);
        }
        let event = match self.pin {
            Pin::Cs => Event::Cs(level),
            Pin::Dc => Event::Dc(level),
            Pin::Rst => Event::Rst(level),
        };
        self.log.borrow_mut().push(event);
        Ok(())
    }
}

impl ErrorType for MockPin {
    type Error = ErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

#[derive(Default)]
struct BusyScript {
    queued: VecDeque<bool>,
    level: bool,
    reads: usize,
}

/// Handle a test keeps to steer the busy line after the driver owns the pin
#[derive(Clone, Default)]
pub struct BusyHandle(Rc<RefCell<BusyScript>>);

impl BusyHandle {
    /// Level returned once the queued readings are used up
    pub fn set(&self, busy: bool) {
        self.0.borrow_mut().level = busy;
    }

    /// Readings returned before falling back to the steady level
    pub fn queue(&self, levels: &[bool]) {
        self.0.borrow_mut().queued.extend(levels.iter().copied());
    }

    pub fn reads(&self) -> usize {
        self.0.borrow().reads
    }
}

pub struct MockBusy {
    log: Timeline,
    script: BusyHandle,
}

impl MockBusy {
    pub fn new(log: &Timeline) -> (Self, BusyHandle) {
        let handle = BusyHandle::default();
        (
            Self {
                log: log.clone(),
                script: handle.clone(),
            },
            handle,
        )
    }
}

impl ErrorType for MockBusy {
    type Error = Infallible;
}

impl InputPin for MockBusy {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut script = self.script.0.borrow_mut();
        script.reads += 1;
        let level = match script.queued.pop_front() {
            Some(level) => level,
            None => script.level,
        };
        self.log.borrow_mut().push(Event::BusyRead(level));
        Ok(level)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Busy line whose reads always fail
pub struct BrokenBusy;

impl ErrorType for BrokenBusy {
    type Error = ErrorKind;
}

impl InputPin for BrokenBusy {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Err(ErrorKind::Other)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Err(ErrorKind::Other)
    }
}

pub struct MockDelay {
    log: Timeline,
}

impl MockDelay {
    pub fn new(log: &Timeline) -> Self {
        Self { log: log.clone() }
    }

    fn push(&mut self, ns: u64) {
        self.log.borrow_mut().push(Event::DelayNs(ns));
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.push(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.push(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.push(u64::from(ms) * 1_000_000);
    }
}

pub type Ctrl4 = Controller<SpiInterface<MockBus, MockPin, MockPin>, MockPin, MockBusy, MockDelay>;

/// Enabled 4-wire controller on a fresh timeline, with the enable traffic
/// already cleared from the log
pub fn controller_4wire() -> (Ctrl4, BusyHandle, Timeline) {
    let log = timeline();
    let iface = SpiInterface::four_wire(
        MockBus::new(&log),
        MockPin::new(&log, Pin::Cs),
        MockPin::new(&log, Pin::Dc),
        4_000_000,
    );
    let (busy, handle) = MockBusy::new(&log);
    let mut ctrl = Controller::new(
        iface,
        MockPin::new(&log, Pin::Rst),
        busy,
        MockDelay::new(&log),
        BusyWait::default(),
    );
    ctrl.interface
        .enable()
        .unwrap_or_else(|e| panic!("mock bus failed to enable: {}", e));
    log.borrow_mut().clear();
    (ctrl, handle, log)
}
