// moss-rt: cooperative supervisor runtime for the ESP32-C3
//
// Binds the moss-supervisor collaborator traits to esp-hal: tick
// timer, heap stats, efuse identity, USB-Serial-JTAG console.

#![no_std]

pub mod board;
pub mod runtime;
