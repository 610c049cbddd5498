//! Recording stand-ins for the bus, the mode switch and the delay.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::Write;
use embedded_hal::digital::v2::InputPin;

use crate::si5351::ADDRESS;

#[derive(Debug)]
pub struct Nack;

/// Records every `(register, value)` write, including ones it rejects.
#[derive(Clone, Default)]
pub struct MockBus {
    writes: Rc<RefCell<Vec<(u8, u8)>>>,
    failing: Rc<Cell<bool>>,
}

impl MockBus {
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.writes.borrow().clone()
    }

    pub fn clear(&self) {
        self.writes.borrow_mut().clear();
    }

    pub fn fail(&self, failing: bool) {
        self.failing.set(failing);
    }
}

impl Write for MockBus {
    type Error = Nack;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Nack> {
        assert_eq!(address, ADDRESS);
        assert_eq!(bytes.len(), 2, "one register per transaction");
        self.writes.borrow_mut().push((bytes[0], bytes[1]));
        if self.failing.get() {
            Err(Nack)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug)]
pub struct PinFault;

/// Plays back queued levels; `None` is a failed read. Once the queue is empty
/// the last level is held.
#[derive(Clone, Default)]
pub struct MockSwitch {
    queue: Rc<RefCell<VecDeque<Option<bool>>>>,
    level: Rc<Cell<bool>>,
    reads: Rc<Cell<usize>>,
}

impl MockSwitch {
    pub fn set(&self, level: bool) {
        self.queue.borrow_mut().clear();
        self.level.set(level);
    }

    pub fn script(&self, levels: &[Option<bool>]) {
        self.queue.borrow_mut().extend(levels.iter().copied());
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl InputPin for MockSwitch {
    type Error = PinFault;

    fn is_high(&self) -> Result<bool, PinFault> {
        self.reads.set(self.reads.get() + 1);
        match self.queue.borrow_mut().pop_front() {
            Some(Some(level)) => {
                self.level.set(level);
                Ok(level)
            }
            Some(None) => Err(PinFault),
            None => Ok(self.level.get()),
        }
    }

    fn is_low(&self) -> Result<bool, PinFault> {
        self.is_high().map(|high| !high)
    }
}

/// Adds up requested delays instead of sleeping.
#[derive(Clone, Default)]
pub struct MockDelay {
    total_ms: Rc<Cell<u32>>,
}

impl MockDelay {
    pub fn total_ms(&self) -> u32 {
        self.total_ms.get()
    }
}

impl DelayMs<u32> for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.total_ms.set(self.total_ms.get() + ms);
    }
}
