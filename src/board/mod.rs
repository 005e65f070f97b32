// Hardware bindings for the supervisor collaborator traits.
// clock: 1 ms tick counter fed by the TIMG0 interrupt
// heap:  heap fence over esp-alloc internal stats
// port:  efuse identity, bootloader entry
// usb:   USB-Serial-JTAG console as the device stack

pub mod clock;
pub mod heap;
pub mod port;
pub mod usb;

pub use clock::SystemClock;
pub use heap::HeapGuard;
pub use port::EspPort;
pub use usb::SerialJtagStack;
