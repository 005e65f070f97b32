// Millisecond tick shared between the timer interrupt and the main
// context.

use moss_supervisor::clock::{Clock, TickCell};

/// Milliseconds since boot. Written only by the tick interrupt.
pub static TICKS_MS: TickCell = TickCell::new(0);

/// Called from the periodic timer interrupt handler, once per ms.
#[inline]
pub fn on_tick() {
    TICKS_MS.advance(1);
}

/// [`Clock`] over the ISR-maintained tick counter.
#[derive(Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        TICKS_MS.get()
    }
}
