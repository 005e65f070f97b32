// Descriptor serial number, derived once from the processor unique id.

/// Length in bytes of the processor unique identifier (the ESP32-C3
/// factory base MAC).
pub const UID_LEN: usize = 6;

/// UTF-16 code units in the serial number descriptor: one header slot
/// plus two hex digits per identifier byte.
pub const SERIAL_UNITS: usize = 1 + UID_LEN * 2;

const NIBBLE_TO_HEX: [u8; 16] = *b"0123456789ABCDEF";

/// Serial number as UTF-16 code units, served verbatim as the USB
/// string descriptor payload. Slot 0 is reserved for the descriptor
/// header (length/type) and is never touched by [`load`](Self::load).
pub struct SerialNumber {
    units: [u16; SERIAL_UNITS],
}

impl SerialNumber {
    pub const fn new() -> Self {
        Self {
            units: [0; SERIAL_UNITS],
        }
    }

    /// Derive the serial number from the unique id: two uppercase hex
    /// digits per byte, low nibble first. Deterministic; recomputing
    /// from the same id rewrites the identical buffer.
    pub fn load(&mut self, uid: &[u8; UID_LEN]) {
        for (i, byte) in uid.iter().enumerate() {
            for j in 0..2 {
                let nibble = (byte >> (j * 4)) & 0xf;
                self.units[1 + i * 2 + j] = NIBBLE_TO_HEX[nibble as usize] as u16;
            }
        }
    }

    /// Fill the reserved header slot. Called by the descriptor layer,
    /// not by `load`.
    pub fn set_header(&mut self, unit: u16) {
        self.units[0] = unit;
    }

    /// The full descriptor buffer, header slot included.
    pub fn units(&self) -> &[u16; SERIAL_UNITS] {
        &self.units
    }

    /// The derived hex digits, without the header slot.
    pub fn digits(&self) -> &[u16] {
        &self.units[1..]
    }
}

impl Default for SerialNumber {
    fn default() -> Self {
        Self::new()
    }
}
