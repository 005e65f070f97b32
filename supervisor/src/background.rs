// One fixed-order maintenance sweep per call, bracketed by heap
// fencing, plus the advisory liveness predicate a watchdog feeder
// polls.
//
// Latency-sensitive subsystems (audio DMA, display refresh) are
// serviced before I/O pumping so USB and network traffic cannot
// starve them on the single execution context. The heap assertions
// pin corruption to the round where it first becomes observable.

use core::fmt;

use crate::clock::{Clock, TickCell};

/// Milliseconds after the last completed round before `is_alive()`
/// turns false.
pub const LIVENESS_WINDOW_MS: u64 = 1000;

/// Capacity of the maintenance hook list.
pub const MAX_HOOKS: usize = 4;

/// A no-argument periodic service routine for one device subsystem.
pub trait MaintenanceHook {
    fn service(&mut self);
}

/// Heap-integrity check primitive. `false` means corruption.
pub trait HeapCheck {
    fn heap_ok(&self) -> bool;
}

/// One iteration of USB stack processing, run at the end of every
/// round.
pub trait UsbPump {
    fn pump(&mut self);
}

#[derive(Debug, Clone, Copy)]
pub struct HookListFull;

impl fmt::Display for HookListFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "maintenance hook list full")
    }
}

/// Runs the maintenance sweep and owns the last-completed-round stamp.
///
/// Hooks are registered once at startup; registration order is
/// service order, and the USB pump always runs after the last hook.
pub struct BackgroundScheduler<'a, C: Clock, H: HeapCheck> {
    clock: C,
    heap: H,
    hooks: heapless::Vec<&'a mut dyn MaintenanceHook, MAX_HOOKS>,
    last_completed: &'a TickCell,
}

impl<'a, C: Clock, H: HeapCheck> BackgroundScheduler<'a, C, H> {
    /// `last_completed` starts at 0 at boot and is written by `round()`
    /// only. Nothing else may write it.
    pub fn new(clock: C, heap: H, last_completed: &'a TickCell) -> Self {
        Self {
            clock,
            heap,
            hooks: heapless::Vec::new(),
            last_completed,
        }
    }

    pub fn add_hook(&mut self, hook: &'a mut dyn MaintenanceHook) -> Result<(), HookListFull> {
        self.hooks.push(hook).map_err(|_| HookListFull)
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Run exactly one maintenance round: heap fence, every hook in
    /// registration order, USB pump, heap fence, then stamp the
    /// completion tick.
    ///
    /// Panics if either heap check fails. Corruption is unsafe to
    /// continue from; the stamp is skipped so the liveness window
    /// runs out and the external watchdog takes over.
    pub fn round(&mut self, usb: &mut dyn UsbPump) {
        self.assert_heap_ok();

        for hook in self.hooks.iter_mut() {
            hook.service();
        }
        usb.pump();

        self.assert_heap_ok();

        self.last_completed.set(self.clock.now_ms());
    }

    fn assert_heap_ok(&self) {
        if !self.heap.heap_ok() {
            panic!("heap corruption detected");
        }
    }
}

/// Freshness predicate over the last completed round.
///
/// Pure and advisory: it cannot halt or restart a stuck round. An
/// external supervisor polls it to decide whether to keep feeding the
/// hardware watchdog. Never panics.
pub struct LivenessMonitor<'a, C: Clock> {
    clock: C,
    last_completed: &'a TickCell,
}

impl<'a, C: Clock> LivenessMonitor<'a, C> {
    pub fn new(clock: C, last_completed: &'a TickCell) -> Self {
        Self {
            clock,
            last_completed,
        }
    }

    /// True while a round completed less than [`LIVENESS_WINDOW_MS`]
    /// ago.
    pub fn is_alive(&self) -> bool {
        self.clock
            .now_ms()
            .wrapping_sub(self.last_completed.get())
            < LIVENESS_WINDOW_MS
    }
}
