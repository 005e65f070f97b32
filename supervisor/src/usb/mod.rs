// USB virtual-serial control plane: stack lifecycle, serial-number
// derivation, and the two policy handlers layered on the stack's
// reports (line state -> bootloader touch, wanted byte -> interpreter
// interrupt).

pub mod serial_number;
pub mod stack;

pub use serial_number::{SERIAL_UNITS, SerialNumber, UID_LEN};
pub use stack::{LineCoding, UsbDeviceStack, UsbEvent};

use log::{info, warn};

use crate::background::UsbPump;

/// Baud rate a host sets, then drops DTR, to request a firmware
/// update without physical access.
pub const BOOTLOADER_TOUCH_BAUD: u32 = 1200;

/// Byte registered with the stack's wanted-byte trigger at init
/// (Ctrl-C).
///
/// Registered exactly once. The byte compared when the trigger fires
/// is [`Interpreter::interrupt_char`], which can be reconfigured at
/// runtime; if the two diverge the stack keeps reporting only this
/// value, so the new byte never triggers. Deliberately two values.
#[cfg(feature = "interrupt-char")]
pub const WANTED_CHAR: u8 = 0x03;

/// Platform services consumed by the control channel.
pub trait Port {
    /// Fixed-length unique processor identifier.
    fn unique_id(&self) -> [u8; UID_LEN];

    /// Restart into the device bootloader. Never returns on hardware;
    /// mock implementations return so tests can count invocations.
    fn reset_to_bootloader(&mut self);
}

/// Interpreter-side cancellation hooks.
pub trait Interpreter {
    /// Currently configured interrupt byte, if any. Reconfigurable at
    /// runtime, independently of the byte registered with the stack.
    fn interrupt_char(&self) -> Option<u8>;

    /// Deliver a keyboard-interrupt to the interpreter.
    fn keyboard_interrupt(&mut self);
}

/// Owns the USB lifecycle triple (`init` / `enabled` / `pump`) and
/// the control-line and wanted-byte policy.
pub struct UsbControlChannel<S, P, I> {
    stack: S,
    port: P,
    interpreter: I,
    serial: SerialNumber,
    initialized: bool,
}

impl<S, P, I> UsbControlChannel<S, P, I>
where
    S: UsbDeviceStack,
    P: Port,
    I: Interpreter,
{
    pub fn new(stack: S, port: P, interpreter: I) -> Self {
        Self {
            stack,
            port,
            interpreter,
            serial: SerialNumber::new(),
            initialized: false,
        }
    }

    /// Bring up the USB function set: controller hardware, serial
    /// number, stack start, wanted-byte registration, serial-MIDI.
    ///
    /// Call once, before the first `pump()`; repeat calls warn and
    /// return.
    pub fn init(&mut self) {
        if self.initialized {
            warn!("usb: init called twice");
            return;
        }

        self.stack.init_hardware();

        let uid = self.port.unique_id();
        self.serial.load(&uid);

        self.stack.start(&self.serial);

        #[cfg(feature = "interrupt-char")]
        self.stack.set_wanted_byte(WANTED_CHAR);

        self.stack.start_midi();

        self.initialized = true;
        info!("usb: started");
    }

    /// Whether the stack has completed initialization. No side
    /// effects.
    pub fn enabled(&self) -> bool {
        self.stack.inited()
    }

    /// Descriptor serial number derived at init.
    pub fn serial_number(&self) -> &SerialNumber {
        &self.serial
    }

    /// If enabled, drive one iteration of stack processing, handle
    /// whatever it reported, then flush buffered outbound serial
    /// data.
    pub fn pump(&mut self) {
        if !self.enabled() {
            return;
        }

        self.stack.service();
        while let Some(event) = self.stack.next_event() {
            self.handle_event(event);
        }
        self.stack.flush_write();
    }

    fn handle_event(&mut self, event: UsbEvent) {
        match event {
            UsbEvent::Mounted => self.mounted(),
            UsbEvent::Unmounted => self.unmounted(),
            UsbEvent::LineState { dtr, .. } => self.line_state(dtr),
            UsbEvent::WantedByte(byte) => self.wanted_byte(byte),
        }
    }

    // DTR deasserted counts as disconnected. A disconnect with the
    // line coding at 1200 baud is the host convention for requesting
    // a firmware update; any other rate is just a disconnect.
    fn line_state(&mut self, dtr: bool) {
        if dtr {
            return;
        }
        let coding = self.stack.line_coding();
        if coding.bit_rate == BOOTLOADER_TOUCH_BAUD {
            info!("usb: {} baud touch, entering bootloader", coding.bit_rate);
            self.port.reset_to_bootloader();
        }
    }

    // The stack only ever reports the byte registered at init; the
    // comparison is against the interpreter's current interrupt byte,
    // so a runtime reconfiguration silently disarms the trigger.
    #[cfg(feature = "interrupt-char")]
    fn wanted_byte(&mut self, byte: u8) {
        if self.interpreter.interrupt_char() == Some(byte) {
            self.stack.flush_read();
            self.interpreter.keyboard_interrupt();
        }
    }

    #[cfg(not(feature = "interrupt-char"))]
    fn wanted_byte(&mut self, _byte: u8) {}

    // Mount/unmount extension points, currently no-ops.
    fn mounted(&mut self) {}

    fn unmounted(&mut self) {}
}

impl<S, P, I> UsbPump for UsbControlChannel<S, P, I>
where
    S: UsbDeviceStack,
    P: Port,
    I: Interpreter,
{
    fn pump(&mut self) {
        UsbControlChannel::pump(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct Shared {
        calls: RefCell<Vec<&'static str>>,
        events: RefCell<VecDeque<UsbEvent>>,
        coding: Cell<LineCoding>,
        started: Cell<bool>,
        wanted: Cell<Option<u8>>,
        resets: Cell<u32>,
        interrupts: Cell<u32>,
        interrupt_char: Cell<Option<u8>>,
    }

    impl Shared {
        fn push_event(&self, event: UsbEvent) {
            self.events.borrow_mut().push_back(event);
        }

        fn count(&self, name: &str) -> usize {
            self.calls.borrow().iter().filter(|&&c| c == name).count()
        }
    }

    struct MockStack(Rc<Shared>);

    impl UsbDeviceStack for MockStack {
        fn init_hardware(&mut self) {
            self.0.calls.borrow_mut().push("init_hardware");
        }

        fn start(&mut self, serial: &SerialNumber) {
            assert!(
                serial.digits().iter().all(|u| *u != 0),
                "serial number must be derived before start"
            );
            self.0.calls.borrow_mut().push("start");
            self.0.started.set(true);
        }

        fn inited(&self) -> bool {
            self.0.started.get()
        }

        fn service(&mut self) {
            self.0.calls.borrow_mut().push("service");
        }

        fn next_event(&mut self) -> Option<UsbEvent> {
            self.0.events.borrow_mut().pop_front()
        }

        fn flush_write(&mut self) {
            self.0.calls.borrow_mut().push("flush_write");
        }

        fn flush_read(&mut self) {
            self.0.calls.borrow_mut().push("flush_read");
        }

        fn line_coding(&self) -> LineCoding {
            self.0.coding.get()
        }

        fn set_wanted_byte(&mut self, byte: u8) {
            self.0.calls.borrow_mut().push("set_wanted_byte");
            self.0.wanted.set(Some(byte));
        }

        fn start_midi(&mut self) {
            self.0.calls.borrow_mut().push("start_midi");
        }
    }

    struct MockPort(Rc<Shared>);

    impl Port for MockPort {
        fn unique_id(&self) -> [u8; UID_LEN] {
            [0x1F, 0x00, 0xA5, 0x5A, 0xFF, 0x10]
        }

        fn reset_to_bootloader(&mut self) {
            self.0.resets.set(self.0.resets.get() + 1);
        }
    }

    struct MockInterpreter(Rc<Shared>);

    impl Interpreter for MockInterpreter {
        fn interrupt_char(&self) -> Option<u8> {
            self.0.interrupt_char.get()
        }

        fn keyboard_interrupt(&mut self) {
            self.0.interrupts.set(self.0.interrupts.get() + 1);
        }
    }

    fn channel(
        shared: &Rc<Shared>,
    ) -> UsbControlChannel<MockStack, MockPort, MockInterpreter> {
        UsbControlChannel::new(
            MockStack(shared.clone()),
            MockPort(shared.clone()),
            MockInterpreter(shared.clone()),
        )
    }

    #[test]
    #[cfg(feature = "interrupt-char")]
    fn init_runs_bringup_in_order() {
        let shared = Rc::new(Shared::default());
        let mut usb = channel(&shared);

        usb.init();

        assert_eq!(
            *shared.calls.borrow(),
            ["init_hardware", "start", "set_wanted_byte", "start_midi"]
        );
        assert_eq!(shared.wanted.get(), Some(WANTED_CHAR));
        // Serial number derived from the unique id, low nibble first.
        assert_eq!(usb.serial_number().digits()[0], u16::from(b'F'));
        assert_eq!(usb.serial_number().digits()[1], u16::from(b'1'));
        assert!(usb.enabled());
    }

    #[test]
    fn repeat_init_is_ignored() {
        let shared = Rc::new(Shared::default());
        let mut usb = channel(&shared);

        usb.init();
        let calls_after_first = shared.calls.borrow().len();
        usb.init();

        assert_eq!(shared.calls.borrow().len(), calls_after_first);
    }

    #[test]
    fn pump_is_a_noop_before_init() {
        let shared = Rc::new(Shared::default());
        let mut usb = channel(&shared);

        usb.pump();

        assert!(!usb.enabled());
        assert!(shared.calls.borrow().is_empty());
    }

    #[test]
    fn pump_services_then_flushes_outbound() {
        let shared = Rc::new(Shared::default());
        let mut usb = channel(&shared);
        usb.init();
        shared.calls.borrow_mut().clear();

        shared.push_event(UsbEvent::Mounted);
        shared.push_event(UsbEvent::Unmounted);
        usb.pump();

        assert_eq!(*shared.calls.borrow(), ["service", "flush_write"]);
    }

    #[test]
    fn bootloader_touch_fires_on_disconnect_at_1200() {
        let shared = Rc::new(Shared::default());
        let mut usb = channel(&shared);
        usb.init();

        shared.coding.set(LineCoding {
            bit_rate: 1200,
            ..LineCoding::default()
        });
        shared.push_event(UsbEvent::LineState {
            dtr: false,
            rts: false,
        });
        usb.pump();

        assert_eq!(shared.resets.get(), 1);
    }

    #[test]
    fn other_bit_rates_disconnect_silently() {
        let shared = Rc::new(Shared::default());
        let mut usb = channel(&shared);
        usb.init();

        shared.coding.set(LineCoding {
            bit_rate: 9600,
            ..LineCoding::default()
        });
        shared.push_event(UsbEvent::LineState {
            dtr: false,
            rts: false,
        });
        usb.pump();

        assert_eq!(shared.resets.get(), 0);
    }

    #[test]
    fn connect_never_triggers_bootloader() {
        let shared = Rc::new(Shared::default());
        let mut usb = channel(&shared);
        usb.init();

        shared.coding.set(LineCoding {
            bit_rate: 1200,
            ..LineCoding::default()
        });
        shared.push_event(UsbEvent::LineState {
            dtr: true,
            rts: false,
        });
        usb.pump();

        assert_eq!(shared.resets.get(), 0);
    }

    #[test]
    #[cfg(feature = "interrupt-char")]
    fn matching_wanted_byte_flushes_rx_and_interrupts() {
        let shared = Rc::new(Shared::default());
        let mut usb = channel(&shared);
        usb.init();
        shared.interrupt_char.set(Some(WANTED_CHAR));

        shared.push_event(UsbEvent::WantedByte(WANTED_CHAR));
        usb.pump();

        assert_eq!(shared.interrupts.get(), 1);
        assert_eq!(shared.count("flush_read"), 1);
    }

    #[test]
    #[cfg(feature = "interrupt-char")]
    fn mismatched_byte_does_nothing() {
        let shared = Rc::new(Shared::default());
        let mut usb = channel(&shared);
        usb.init();
        shared.interrupt_char.set(Some(WANTED_CHAR));

        shared.push_event(UsbEvent::WantedByte(0x11));
        usb.pump();

        assert_eq!(shared.interrupts.get(), 0);
        assert_eq!(shared.count("flush_read"), 0);
    }

    #[test]
    #[cfg(feature = "interrupt-char")]
    fn reconfigured_interrupt_char_disarms_the_trigger() {
        let shared = Rc::new(Shared::default());
        let mut usb = channel(&shared);
        usb.init();

        // The stack still reports the byte registered at init; a
        // runtime change of the interrupt byte means no match, ever.
        shared.interrupt_char.set(Some(0x11));
        shared.push_event(UsbEvent::WantedByte(WANTED_CHAR));
        usb.pump();

        assert_eq!(shared.interrupts.get(), 0);
        assert_eq!(shared.count("flush_read"), 0);
    }

    #[test]
    #[cfg(feature = "interrupt-char")]
    fn disabled_interrupt_char_never_matches() {
        let shared = Rc::new(Shared::default());
        let mut usb = channel(&shared);
        usb.init();

        shared.interrupt_char.set(None);
        shared.push_event(UsbEvent::WantedByte(WANTED_CHAR));
        usb.pump();

        assert_eq!(shared.interrupts.get(), 0);
    }
}
