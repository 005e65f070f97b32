// Millisecond tick plumbing between the timer interrupt and the main
// context. riscv32imc has no 64-bit atomics, so shared counters go
// through critical sections instead.

use core::cell::Cell;

use critical_section::Mutex;

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Shared 64-bit counter: one writer, any readers.
///
/// Backs both the ISR-driven tick counter and the last-completed-round
/// stamp. The critical section keeps reads whole on 32-bit targets.
pub struct TickCell(Mutex<Cell<u64>>);

impl TickCell {
    pub const fn new(value: u64) -> Self {
        Self(Mutex::new(Cell::new(value)))
    }

    pub fn get(&self) -> u64 {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }

    pub fn set(&self, value: u64) {
        critical_section::with(|cs| self.0.borrow(cs).set(value));
    }

    /// Add `ms` to the counter. Called from the tick interrupt.
    #[inline]
    pub fn advance(&self, ms: u64) {
        critical_section::with(|cs| {
            let cell = self.0.borrow(cs);
            cell.set(cell.get().wrapping_add(ms));
        });
    }
}
