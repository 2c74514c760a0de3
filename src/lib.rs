//! Mirror box firmware: picomotor position estimation and the cooperative
//! scheduler that runs it.
//!
//! Everything except `hal` is target independent and tested on the host.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

pub mod application;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod logger;
pub mod os;
pub mod positioning;
pub mod protocol;
pub mod registers;
pub mod rtos;

#[cfg(target_arch = "avr")]
pub mod hal;
