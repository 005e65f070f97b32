// Interpreter-facing cancellation plumbing. The interpreter proper
// lives elsewhere; this holds the runtime-configurable interrupt byte
// and the pending-interrupt flag its execution loop polls.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use moss_supervisor::usb::Interpreter;

// cs: Option<u8> is wider than the load/store atomics riscv32imc has.
// Boots armed with Ctrl-C, the same byte the USB init registers.
static INTERRUPT_CHAR: Mutex<Cell<Option<u8>>> = Mutex::new(Cell::new(Some(0x03)));

static INTERRUPT_PENDING: AtomicBool = AtomicBool::new(false);

/// Reconfigure the interrupt byte. `None` disables cancellation.
/// Note the USB stack keeps reporting only the byte registered at
/// init, so a different value here disarms the trigger entirely.
pub fn set_interrupt_char(byte: Option<u8>) {
    critical_section::with(|cs| INTERRUPT_CHAR.borrow(cs).set(byte));
}

pub fn interrupt_char() -> Option<u8> {
    critical_section::with(|cs| INTERRUPT_CHAR.borrow(cs).get())
}

/// Consume a pending interrupt. The interpreter polls this between
/// statements.
pub fn take_interrupt() -> bool {
    // cs: riscv32imc has no atomic swap.
    critical_section::with(|_| {
        let pending = INTERRUPT_PENDING.load(Ordering::Relaxed);
        if pending {
            INTERRUPT_PENDING.store(false, Ordering::Relaxed);
        }
        pending
    })
}

/// Interpreter seam handed to the USB control channel.
pub struct ReplControl;

impl Interpreter for ReplControl {
    fn interrupt_char(&self) -> Option<u8> {
        interrupt_char()
    }

    fn keyboard_interrupt(&mut self) {
        INTERRUPT_PENDING.store(true, Ordering::Release);
    }
}
