// moss-supervisor: cooperative maintenance core for the moss runtime.
// clock:      monotonic tick plumbing shared between ISR and main loop
// background: fixed-order maintenance sweep, heap fencing, liveness
// usb:        USB virtual-serial lifecycle, serial number, line policy

#![cfg_attr(not(test), no_std)]

pub mod background;
pub mod clock;
pub mod usb;
