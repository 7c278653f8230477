//! The operations behind the host-facing entry points.

use crate::controller::{Calibration, Controller};
use crate::device::mask_address;
use crate::error::Error;
use crate::poll::PollLimit;
use crate::registers::Registers;
use crate::rom::RomRoutines;
use core::fmt::Debug;
use hardware_traits::HardwareFlashDevice;

/// Entry point return code for success.
pub const STATUS_OK: u32 = 0;
/// Entry point return code for failure.
pub const STATUS_FAILED: u32 = 1;

/// Only this many leading bytes of a verify request are read back and compared.
pub const VERIFY_WINDOW: usize = 16;

/// Fold an operation result into the numeric code the host expects.
pub fn status<T>(result: Result<T, Error>) -> u32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(_) => STATUS_FAILED,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Bound for the bring-up spins. Unbounded on target.
    pub poll_limit: PollLimit,
}

pub struct FlashAlgorithm<R, O> {
    controller: Controller<R, O>,
    calibration: Option<Calibration>,
}

impl<R, O> Debug for FlashAlgorithm<R, O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlashAlgorithm")
            .field("calibration", &self.calibration)
            .finish()
    }
}

impl<R, O> FlashAlgorithm<R, O>
where
    R: Registers,
    O: RomRoutines,
{
    pub fn new(regs: R, rom: O) -> Self {
        Self::with_config(regs, rom, Config::default())
    }

    pub fn with_config(regs: R, rom: O, config: Config) -> Self {
        FlashAlgorithm {
            controller: Controller::new(regs, rom, config.poll_limit),
            calibration: None,
        }
    }

    /// Rebuild the algorithm around an existing session.
    ///
    /// The target binary keeps no live instance between entry point calls, only
    /// the calibration chosen by `init`.
    pub fn resume(regs: R, rom: O, calibration: Option<Calibration>) -> Self {
        let mut algo = Self::new(regs, rom);
        algo.calibration = calibration;
        algo
    }

    /// Calibration picked by the last `init`, if the part was recognised.
    pub fn calibration(&self) -> Option<Calibration> {
        self.calibration
    }

    pub fn into_parts(self) -> (R, O) {
        self.controller.into_parts()
    }

    /// Enable clocks, configure the controller and unprotect the part.
    ///
    /// `addr`, `clk` and `fnc` are accepted for the host contract but the
    /// sequence is the same for every value.
    pub fn init(&mut self, addr: u32, clk: u32, fnc: u32) -> Result<(), Error> {
        log_debug!("init addr={:#x} clk={} fnc={}", addr, clk, fnc);
        self.calibration = self.controller.bring_up()?;
        log_info!("flash controller ready");
        Ok(())
    }

    /// Ends the session. Clocks and pin muxing stay as `init` left them.
    pub fn uninit(&mut self, fnc: u32) -> Result<(), Error> {
        log_debug!("uninit fnc={}", fnc);
        self.calibration = None;
        Ok(())
    }

    /// Always reports blank; the part is never read.
    pub fn blank_check(&mut self, addr: u32, size: u32, pattern: u8) -> Result<(), Error> {
        log_debug!("blank check {:#x}+{:#x} pattern {:#x} skipped", addr, size, pattern);
        Ok(())
    }

    /// Erase the whole array. Completion is not verified.
    pub fn erase_chip(&mut self) -> Result<(), Error> {
        self.controller.erase_chip();
        Ok(())
    }

    /// Erase the 4 KiB sector holding `addr`, which need not be aligned.
    pub fn erase_sector(&mut self, addr: u32) -> Result<(), Error> {
        let offset = mask_address(addr);
        self.controller.rom().erase_sector(offset);
        Ok(())
    }

    /// Program `data` at `addr`. The range must already be erased.
    pub fn program_page(&mut self, addr: u32, data: &[u8]) -> Result<(), Error> {
        let offset = mask_address(addr);
        self.controller.rom().write(offset, data);
        Ok(())
    }

    /// Compare flash at `addr` against `expected`.
    ///
    /// Only the first [`VERIFY_WINDOW`] bytes are read back; differences past
    /// that point go unnoticed.
    pub fn verify(&mut self, addr: u32, expected: &[u8]) -> Result<(), Error> {
        let offset = mask_address(addr);
        let len = expected.len().min(VERIFY_WINDOW);
        let mut actual = [0u8; VERIFY_WINDOW];

        let rom = self.controller.rom();
        rom.flush_cache();
        rom.read(offset, &mut actual[..len]);

        match actual[..len]
            .iter()
            .zip(&expected[..len])
            .position(|(a, e)| a != e)
        {
            Some(index) => {
                log_warn!("verify mismatch at {:#x}", offset + index as u32);
                Err(Error::VerifyMismatch {
                    offset: offset + index as u32,
                })
            }
            None => Ok(()),
        }
    }
}

impl<R, O> HardwareFlashDevice for FlashAlgorithm<R, O>
where
    R: Registers,
    O: RomRoutines,
{
    type Error = Error;

    /// Reads flash contents into `data` through the refreshed read cache.
    ///
    /// Unlike [`FlashAlgorithm::verify`] the whole buffer is filled.
    fn read(&mut self, addr: u32, data: &mut [u8]) -> Result<(), Error> {
        let offset = mask_address(addr);
        let rom = self.controller.rom();
        rom.flush_cache();
        rom.read(offset, data);
        Ok(())
    }

    fn sector_erase(&mut self, addr: u32) -> Result<(), Error> {
        self.erase_sector(addr)
    }

    fn page_program(&mut self, addr: u32, data: &[u8]) -> Result<(), Error> {
        self.program_page(addr, data)
    }

    fn chip_erase(&mut self) -> Result<(), Error> {
        self.erase_chip()
    }
}
