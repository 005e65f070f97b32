// USB-Serial-JTAG console bound to the UsbDeviceStack seam.
//
// The ROM handles CDC enumeration and descriptors for this
// controller, so init/start are bookkeeping here. RX bytes are
// scanned for the registered wanted byte as they are drained; host
// line-coding changes are not surfaced by this peripheral driver, so
// the last known coding is reported.

use esp_hal::Blocking;
use esp_hal::usb_serial_jtag::UsbSerialJtag;
use log::info;

use moss_supervisor::usb::{LineCoding, SerialNumber, UID_LEN, UsbDeviceStack, UsbEvent};

/// Buffered inbound console bytes awaiting the runtime reader.
const RX_BUF: usize = 64;

const EVENT_QUEUE: usize = 4;

pub struct SerialJtagStack<'d> {
    serial: UsbSerialJtag<'d, Blocking>,
    started: bool,
    wanted: Option<u8>,
    coding: LineCoding,
    rx: heapless::Deque<u8, RX_BUF>,
    events: heapless::Deque<UsbEvent, EVENT_QUEUE>,
}

impl<'d> SerialJtagStack<'d> {
    pub fn new(serial: UsbSerialJtag<'d, Blocking>) -> Self {
        Self {
            serial,
            started: false,
            wanted: None,
            coding: LineCoding::default(),
            rx: heapless::Deque::new(),
            events: heapless::Deque::new(),
        }
    }

    /// Next buffered console byte, for the runtime's console reader.
    pub fn read(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn accept(&mut self, byte: u8) {
        // The byte stays in the console buffer either way; a matching
        // wanted byte is additionally reported as an event and cleared
        // later by flush_read.
        if self.rx.push_back(byte).is_err() {
            // Oldest byte gives way when the runtime falls behind.
            self.rx.pop_front();
            let _ = self.rx.push_back(byte);
        }
        if self.wanted == Some(byte) {
            let _ = self.events.push_back(UsbEvent::WantedByte(byte));
        }
    }
}

impl UsbDeviceStack for SerialJtagStack<'_> {
    fn init_hardware(&mut self) {
        // Controller bring-up is owned by the ROM; nothing to do.
    }

    fn start(&mut self, serial: &SerialNumber) {
        let mut digits = heapless::String::<{ 2 * UID_LEN }>::new();
        for &unit in serial.digits() {
            let _ = digits.push(unit as u8 as char);
        }
        info!("usb: serial-jtag console up, serial {}", digits);
        self.started = true;
    }

    fn inited(&self) -> bool {
        self.started
    }

    fn service(&mut self) {
        loop {
            match self.serial.read_byte() {
                Ok(byte) => self.accept(byte),
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(_)) => break,
            }
        }
    }

    fn next_event(&mut self) -> Option<UsbEvent> {
        self.events.pop_front()
    }

    fn flush_write(&mut self) {
        let _ = self.serial.flush_tx();
    }

    fn flush_read(&mut self) {
        while self.rx.pop_front().is_some() {}
    }

    fn line_coding(&self) -> LineCoding {
        self.coding
    }

    fn set_wanted_byte(&mut self, byte: u8) {
        self.wanted = Some(byte);
    }
}
