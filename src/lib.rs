//! Target-resident flash programming algorithm for the RDA5981 on-chip SPI NOR
//! flash.
//!
//! The debug host drives the algorithm through the `Init`/`UnInit`/`BlankCheck`/
//! `EraseChip`/`EraseSector`/`ProgramPage`/`Verify` contract exported by the
//! binary target. Everything below that contract lives here so it can be
//! exercised against a simulated chip on the host.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod logging;

pub mod algorithm;
pub mod controller;
pub mod device;
pub mod error;
pub mod poll;
pub mod registers;
pub mod rom;

#[cfg(test)]
mod sim;

pub use algorithm::{status, Config, FlashAlgorithm, STATUS_FAILED, STATUS_OK};
pub use controller::{Calibration, Controller, JedecId};
pub use device::{FlashDeviceDescription, DEVICE, FLASH_SIZE};
pub use error::{Error, Stage};
pub use poll::PollLimit;
pub use registers::{Mmio, Register, Registers};
pub use rom::{BootRom, RomRoutines};
