//! Flash controller bring-up and raw command sequencing.
//!
//! Commands are issued by writing an opcode to `FLASH_CMD_ADDR`; data phases
//! go through the TX/RX FIFOs with their length staged in `FLASH_BLOCK_SIZE`.
//! Only one command may be in flight, so every opcode is bracketed by the ROM's
//! write-in-progress reset and busy wait before the FIFOs are touched.

use crate::error::{Error, Stage};
use crate::poll::{spin_until, PollLimit};
use crate::registers::{
    CacheConfig, CacheFlush, ClockGate, FlashConfig, GpioOutput, Register, Registers,
    BLOCK_SIZE_BYTES, FLASH_CLOCK_DIVIDER, FLASH_CLOCK_DIVIDER_VALUE, FLASH_CMD_WINDOW,
    IOMUX_SPI_DEFAULT, IOMUX_SPI_FIELD, IOMUX_SPI_QUAD_DRIVE, IOMUX_SPI_QUAD_RUN,
    NAND_CFG1_TIMING,
};
use crate::rom::RomRoutines;
use bitflags::bitflags;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Opcode {
    /// Write status register 1, optionally followed by status register 2.
    WriteStatus = 0x01,
    /// Write status register 2 alone.
    WriteStatus2 = 0x31,
    ReadStatus2 = 0x35,
    ChipErase = 0x60,
    ReadJedecId = 0x9f,
}

bitflags! {
    /// Status register 2 bits the bring-up cares about.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Status2: u8 {
        /// Set once the protection write has landed on the part.
        const QE = 1 << 1;
    }
}

/// Second ID byte of the parts this board family ships with.
const KNOWN_MEMORY_TYPE: u8 = 0x40;
/// Largest capacity code still using the combined two-byte status write.
const SHORT_STATUS_MAX_CAPACITY: u8 = 0x15;

/// The three bytes returned by the JEDEC ID read, one per RX FIFO word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JedecId {
    pub manufacturer: u8,
    pub memory_type: u8,
    pub capacity: u8,
}

impl JedecId {
    pub fn from_words(words: [u32; 3]) -> Self {
        JedecId {
            manufacturer: words[0] as u8,
            memory_type: words[1] as u8,
            capacity: words[2] as u8,
        }
    }
}

/// Which status-register write sequence clears protection on the probed part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Calibration {
    /// Status registers 1 and 2 written together with opcode `0x01`.
    ShortStatus,
    /// Status register 2 written alone with opcode `0x31`.
    LongStatus,
}

impl Calibration {
    /// Parts with an unknown memory type byte get no classification and no
    /// protection write; bring-up then relies on whatever the part already
    /// holds.
    pub fn classify(id: &JedecId) -> Option<Calibration> {
        if id.memory_type != KNOWN_MEMORY_TYPE {
            return None;
        }
        if id.capacity <= SHORT_STATUS_MAX_CAPACITY {
            Some(Calibration::ShortStatus)
        } else {
            Some(Calibration::LongStatus)
        }
    }
}

/// Exclusive owner of the flash controller registers and the ROM helpers.
pub struct Controller<R, O> {
    regs: R,
    rom: O,
    poll: PollLimit,
}

impl<R, O> core::fmt::Debug for Controller<R, O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("poll", &self.poll)
            .finish()
    }
}

impl<R, O> Controller<R, O>
where
    R: Registers,
    O: RomRoutines,
{
    pub fn new(regs: R, rom: O, poll: PollLimit) -> Self {
        Controller { regs, rom, poll }
    }

    pub fn rom(&mut self) -> &mut O {
        &mut self.rom
    }

    pub fn regs(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn into_parts(self) -> (R, O) {
        (self.regs, self.rom)
    }

    /// Bring the controller from reset to a programmable state.
    ///
    /// Returns how the part was classified. Neither polling loop is bounded
    /// unless the controller was built with [`PollLimit::Iterations`].
    pub fn bring_up(&mut self) -> Result<Option<Calibration>, Error> {
        self.regs
            .set_bits(Register::SCU_CLOCK_GATE, ClockGate::FLASH.bits());
        self.regs.write(Register::FLASH_NAND_CFG1, NAND_CFG1_TIMING);
        self.regs.write(Register::GPIO_IOMUX_CFG0, IOMUX_SPI_DEFAULT);
        self.regs
            .set_bits(Register::SCU_CLOCK_GATE, ClockGate::ICACHE.bits());

        self.map_command_window()?;
        let calibration = self.configure_part()?;

        self.regs.write_field(
            Register::FLASH_CONFIG,
            FLASH_CLOCK_DIVIDER,
            FLASH_CLOCK_DIVIDER_VALUE,
        );
        Ok(calibration)
    }

    /// Map the controller's command window through the instruction cache and
    /// wait for the resulting flush.
    fn map_command_window(&mut self) -> Result<(), Error> {
        self.regs.write(Register::CACHE_ADDR, FLASH_CMD_WINDOW);
        self.regs
            .set_bits(Register::CACHE_CFG, CacheConfig::MAP_WINDOW.bits());

        let regs = &mut self.regs;
        spin_until(self.poll, Stage::CacheFlush, || {
            !CacheFlush::from_bits_truncate(regs.read(Register::CACHE_FLUSH))
                .contains(CacheFlush::BUSY)
        })
    }

    fn configure_part(&mut self) -> Result<Option<Calibration>, Error> {
        self.regs
            .set_bits(Register::FLASH_CONFIG, FlashConfig::FOUR_WIRE.bits());
        self.regs.write_field(
            Register::GPIO_IOMUX_CFG0,
            IOMUX_SPI_FIELD,
            IOMUX_SPI_QUAD_DRIVE,
        );
        self.regs.write(
            Register::GPIO_DATA_OUTPUT,
            (GpioOutput::LINE_18 | GpioOutput::LINE_19).bits(),
        );

        let id = self.read_jedec_id();
        log_debug!(
            "flash id {:#x} {:#x} {:#x}",
            id.manufacturer,
            id.memory_type,
            id.capacity
        );

        let calibration = Calibration::classify(&id);
        match calibration {
            Some(Calibration::ShortStatus) => self.unprotect_short(),
            Some(Calibration::LongStatus) => self.unprotect_long(),
            None => log_warn!("unrecognised flash part, leaving protection untouched"),
        }

        self.wait_unprotected()?;

        self.regs.write_field(
            Register::GPIO_IOMUX_CFG0,
            IOMUX_SPI_FIELD,
            IOMUX_SPI_QUAD_RUN,
        );
        Ok(calibration)
    }

    /// Issue `0x9F` and collect the three ID bytes.
    ///
    /// Whatever an earlier session left in the RX FIFO is drained first.
    pub fn read_jedec_id(&mut self) -> JedecId {
        self.set_block_size(3);
        self.drain_rx::<3>();

        self.rom.spi_wip_reset();
        self.rom.wait_busy_down();
        self.command(Opcode::ReadJedecId);
        self.rom.wait_busy_down();
        self.set_block_size(3);
        self.rom.wait_busy_down();

        JedecId::from_words(self.drain_rx::<3>())
    }

    fn unprotect_short(&mut self) {
        self.rom.spi_wip_reset();
        self.set_block_size(2);
        self.rom.spi_wip_reset();
        self.rom.wait_busy_down();
        self.regs.write(Register::FLASH_TX_FIFO, 0x00);
        self.rom.wait_busy_down();
        self.regs
            .write(Register::FLASH_TX_FIFO, Status2::QE.bits() as u32);
        self.rom.spi_wip_reset();
        self.rom.spi_write_reset();
        self.rom.wait_busy_down();
        self.command(Opcode::WriteStatus);
        self.rom.wait_busy_down();
    }

    fn unprotect_long(&mut self) {
        self.rom.spi_wip_reset();
        self.set_block_size(1);
        self.rom.spi_wip_reset();
        self.rom.wait_busy_down();
        self.regs
            .write(Register::FLASH_TX_FIFO, Status2::QE.bits() as u32);
        self.rom.spi_wip_reset();
        self.rom.spi_write_reset();
        self.rom.wait_busy_down();
        self.command(Opcode::WriteStatus2);
        self.rom.wait_busy_down();
    }

    /// Spin on status register 2 until the part reports `QE`.
    fn wait_unprotected(&mut self) -> Result<(), Error> {
        self.rom.spi_wip_reset();
        self.rom.wait_busy_down();
        let mut status = self.read_status2();

        let poll = self.poll;
        spin_until(poll, Stage::Unprotect, || {
            if status.contains(Status2::QE) {
                return true;
            }
            self.rom.spi_wip_reset();
            status = self.read_status2();
            false
        })?;
        log_debug!("status2 {:#x}", status.bits());
        Ok(())
    }

    fn read_status2(&mut self) -> Status2 {
        self.command(Opcode::ReadStatus2);
        self.rom.wait_busy_down();
        Status2::from_bits_retain(self.regs.read(Register::FLASH_RX_FIFO) as u8)
    }

    /// Full-chip erase issued straight through the command register.
    pub fn erase_chip(&mut self) {
        self.rom.spi_wip_reset();
        self.rom.spi_write_reset();
        self.command(Opcode::ChipErase);
        self.rom.wait_busy_down();
        self.rom.spi_wip_reset();
    }

    fn command(&mut self, opcode: Opcode) {
        self.regs.write(Register::FLASH_CMD_ADDR, opcode as u32);
    }

    fn set_block_size(&mut self, bytes: u32) {
        self.regs
            .write(Register::FLASH_BLOCK_SIZE, BLOCK_SIZE_BYTES.set(0, bytes));
    }

    fn drain_rx<const N: usize>(&mut self) -> [u32; N] {
        let mut words = [0u32; N];
        for word in words.iter_mut() {
            *word = self.regs.read(Register::FLASH_RX_FIFO);
        }
        words
    }
}
