// Processor identity and bootloader entry.

use esp_hal::efuse::Efuse;
use moss_supervisor::usb::{Port, UID_LEN};

pub struct EspPort;

impl Port for EspPort {
    fn unique_id(&self) -> [u8; UID_LEN] {
        Efuse::mac_address()
    }

    fn reset_to_bootloader(&mut self) {
        // The CPU reset drops back into the ROM loader, which the
        // host is holding in download mode for the update.
        esp_hal::system::software_reset()
    }
}
