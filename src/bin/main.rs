// moss-rt entry point and main loop
//
// Boot sequence: logger -> heap -> 1ms tick timer -> USB bring-up
// Main loop: one maintenance round per wake -> WFI
//
// Each round services the registered subsystem hooks in fixed order,
// pumps the USB stack last, and stamps the liveness counter. The
// liveness predicate is advisory; the watchdog feeder that acts on it
// lives outside this loop.

#![no_std]
#![no_main]

use core::cell::RefCell;

use critical_section::Mutex;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::time::Duration;
use esp_hal::timer::PeriodicTimer;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::usb_serial_jtag::UsbSerialJtag;
use log::{info, warn};

use moss_rt::board::clock::{self, SystemClock};
use moss_rt::board::{EspPort, HeapGuard, SerialJtagStack};
use moss_rt::runtime::ReplControl;
use moss_supervisor::background::{BackgroundScheduler, LivenessMonitor};
use moss_supervisor::clock::TickCell;
use moss_supervisor::usb::UsbControlChannel;

esp_bootloader_esp_idf::esp_app_desc!();

const TICK_PERIOD_MS: u64 = 1;

static TIMER0: Mutex<RefCell<Option<PeriodicTimer<'static, esp_hal::Blocking>>>> =
    Mutex::new(RefCell::new(None));

// Written only by BackgroundScheduler::round, at the end of a clean
// round.
static LAST_COMPLETED_MS: TickCell = TickCell::new(0);

#[esp_hal::handler(priority = esp_hal::interrupt::Priority::Priority1)]
fn timer0_handler() {
    critical_section::with(|cs| {
        if let Some(timer) = TIMER0.borrow_ref_mut(cs).as_mut() {
            timer.clear_interrupt();
        }
    });
    clock::on_tick();
}

#[esp_hal::main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);
    // Keep in sync with board::heap::HEAP_SIZE.
    esp_alloc::heap_allocator!(size: 65536);

    info!("booting...");

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let mut timer0 = PeriodicTimer::new(timg0.timer0);
    critical_section::with(|cs| {
        timer0.set_interrupt_handler(timer0_handler);
        timer0.start(Duration::from_millis(TICK_PERIOD_MS)).unwrap();
        timer0.listen();
        TIMER0.borrow_ref_mut(cs).replace(timer0);
    });
    info!("tick timer initialized.");

    let stack = SerialJtagStack::new(UsbSerialJtag::new(peripherals.USB_DEVICE));
    let mut usb = UsbControlChannel::new(stack, EspPort, ReplControl);
    usb.init();

    let mut sched = BackgroundScheduler::new(SystemClock, HeapGuard, &LAST_COMPLETED_MS);
    let liveness = LivenessMonitor::new(SystemClock, &LAST_COMPLETED_MS);
    // Optional subsystem hooks (audio DMA, display refresh, network)
    // register with `sched.add_hook` here as their drivers come up;
    // this board carries none, so a round is fence -> pump -> fence.

    info!("supervisor ready.");

    let mut stall_logged = false;
    loop {
        // Advisory check before the round: false here means the
        // previous round overran its window.
        if !liveness.is_alive() {
            if !stall_logged {
                warn!("background: liveness window missed");
            }
            stall_logged = true;
        } else {
            stall_logged = false;
        }

        sched.round(&mut usb);

        wait_for_interrupt();
    }
}

#[inline]
fn wait_for_interrupt() {
    #[cfg(target_arch = "riscv32")]
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack));
    }
}
