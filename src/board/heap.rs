// Heap fence over esp-alloc's internal stats.

use moss_supervisor::background::HeapCheck;

/// Bytes handed to `esp_alloc::heap_allocator!` in main.rs; keep the
/// two in sync.
pub const HEAP_SIZE: usize = 65536;

/// Trips when the allocator's accounting no longer fits the region it
/// was given, which is how a scribbled-over heap first shows up.
pub struct HeapGuard;

impl HeapCheck for HeapGuard {
    fn heap_ok(&self) -> bool {
        let stats = esp_alloc::HEAP.stats();
        stats.current_usage <= HEAP_SIZE
    }
}
