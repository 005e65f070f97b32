// Abstract USB-host-stack capability. The concrete stack owns
// enumeration and transport; this seam carries what the control plane
// needs: lifecycle, one service iteration, the four callback slots
// (drained as events), and the CDC queries the policy handlers use.

use crate::usb::serial_number::SerialNumber;

/// CDC line coding as last set by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCoding {
    pub bit_rate: u32,
    pub data_bits: u8,
    pub parity: u8,
    pub stop_bits: u8,
}

impl Default for LineCoding {
    fn default() -> Self {
        Self {
            bit_rate: 115_200,
            data_bits: 8,
            parity: 0,
            stop_bits: 1,
        }
    }
}

/// Reports surfaced by the stack during [`UsbDeviceStack::service`]
/// and drained synchronously inside the pump, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbEvent {
    Mounted,
    Unmounted,
    /// A DTR/RTS control-line change on the virtual serial port.
    LineState { dtr: bool, rts: bool },
    /// The byte registered via `set_wanted_byte` arrived on the RX
    /// path. Carries the byte as delivered by the host connection.
    WantedByte(u8),
}

pub trait UsbDeviceStack {
    /// One-time controller bring-up, before `start`.
    fn init_hardware(&mut self);

    /// Start enumeration. The serial number must already be derived;
    /// the stack serves it from its descriptor set.
    fn start(&mut self, serial: &SerialNumber);

    /// Whether stack initialization has completed.
    fn inited(&self) -> bool;

    /// Drive one iteration of the stack's internal processing.
    fn service(&mut self);

    /// Next pending report, if any. Drained after every `service`.
    fn next_event(&mut self) -> Option<UsbEvent>;

    /// Flush buffered outbound serial data.
    fn flush_write(&mut self);

    /// Discard buffered inbound serial data.
    fn flush_read(&mut self);

    /// Line coding currently in effect on the virtual serial port.
    fn line_coding(&self) -> LineCoding;

    /// Register the single byte reported via [`UsbEvent::WantedByte`].
    fn set_wanted_byte(&mut self, byte: u8);

    /// Start the secondary serial-MIDI function, where the stack has
    /// one.
    fn start_midi(&mut self) {}
}
