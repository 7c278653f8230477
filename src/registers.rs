//! Memory-mapped registers touched by the flash controller bring-up.
//!
//! Shared registers (system control, GPIO iomux, flash config) are only ever
//! changed through read-modify-write so bits owned by other subsystems survive.

use bitflags::bitflags;

/// Physical address of a 32-bit memory-mapped register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Register(pub u32);

const SCU_BASE: u32 = 0x4000_0000;
const GPIO_BASE: u32 = 0x4000_1000;
const CACHE_BASE: u32 = 0x4001_4000;
const FLASH_CTL_BASE: u32 = 0x17ff_f000;

impl Register {
    /// System control: AHB clock gates.
    pub const SCU_CLOCK_GATE: Register = Register(SCU_BASE);

    pub const GPIO_DATA_OUTPUT: Register = Register(GPIO_BASE + 0x08);
    pub const GPIO_IOMUX_CFG0: Register = Register(GPIO_BASE + 0x44);

    pub const CACHE_CFG: Register = Register(CACHE_BASE);
    pub const CACHE_FLUSH: Register = Register(CACHE_BASE + 0x04);
    pub const CACHE_ADDR: Register = Register(CACHE_BASE + 0x08);

    /// Writing an opcode here starts a flash command.
    pub const FLASH_CMD_ADDR: Register = Register(FLASH_CTL_BASE);
    /// Byte count of the next data phase, in bits 8 and up.
    pub const FLASH_BLOCK_SIZE: Register = Register(FLASH_CTL_BASE + 0x04);
    pub const FLASH_TX_FIFO: Register = Register(FLASH_CTL_BASE + 0x08);
    pub const FLASH_RX_FIFO: Register = Register(FLASH_CTL_BASE + 0x10);
    pub const FLASH_CONFIG: Register = Register(FLASH_CTL_BASE + 0x14);
    pub const FLASH_NAND_CFG1: Register = Register(FLASH_CTL_BASE + 0x24);
}

/// Flash controller command window mapped through the instruction cache.
pub const FLASH_CMD_WINDOW: u32 = 0x1400_0000;

/// Calibrated controller timing written during bring-up.
pub const NAND_CFG1_TIMING: u32 = 0x030f_1300;
/// Calibrated SPI pin multiplexing written during bring-up.
pub const IOMUX_SPI_DEFAULT: u32 = 0x006d_b6c0;

bitflags! {
    /// AHB clock gates in the system control register.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ClockGate: u32 {
        const FLASH = 1 << 27;
        const ICACHE = 1 << 28;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CacheConfig: u32 {
        /// Map the address in `CACHE_ADDR` into the cached window.
        const MAP_WINDOW = 0xc0;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CacheFlush: u32 {
        /// Set while a flush is in progress.
        const BUSY = 1 << 0;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FlashConfig: u32 {
        const FOUR_WIRE = 1 << 0;
    }
}

bitflags! {
    /// Board GPIO outputs holding the flash /WP and /HOLD lines.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct GpioOutput: u32 {
        const LINE_18 = 1 << 18;
        const LINE_19 = 1 << 19;
    }
}

/// A multi-bit field inside a register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub mask: u32,
    pub shift: u32,
}

impl Field {
    pub const fn new(width: u32, shift: u32) -> Self {
        Field {
            mask: ((1 << width) - 1) << shift,
            shift,
        }
    }

    /// Extract the field from a full register value.
    pub const fn get(&self, value: u32) -> u32 {
        (value & self.mask) >> self.shift
    }

    /// Replace the field in `value`, keeping every other bit.
    pub const fn set(&self, value: u32, field: u32) -> u32 {
        (value & !self.mask) | ((field << self.shift) & self.mask)
    }
}

/// SPI pad function select in `GPIO_IOMUX_CFG0`.
pub const IOMUX_SPI_FIELD: Field = Field::new(6, 18);
/// Pad drive used while probing and unprotecting the part.
pub const IOMUX_SPI_QUAD_DRIVE: u32 = 0x09;
/// Pad function for steady-state 4-wire operation.
pub const IOMUX_SPI_QUAD_RUN: u32 = 0x1b;

/// SPI clock divider in `FLASH_CONFIG`.
pub const FLASH_CLOCK_DIVIDER: Field = Field::new(8, 8);
pub const FLASH_CLOCK_DIVIDER_VALUE: u32 = 0x04;

/// Byte count in `FLASH_BLOCK_SIZE`.
pub const BLOCK_SIZE_BYTES: Field = Field::new(8, 8);

/// Word-wide access to the chip's register file.
pub trait Registers {
    fn read(&mut self, reg: Register) -> u32;

    fn write(&mut self, reg: Register, value: u32);

    /// Read-modify-write.
    fn modify<F>(&mut self, reg: Register, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    fn set_bits(&mut self, reg: Register, bits: u32) {
        self.modify(reg, |value| value | bits);
    }

    fn write_field(&mut self, reg: Register, field: Field, value: u32) {
        self.modify(reg, |current| field.set(current, value));
    }
}

impl<T: Registers + ?Sized> Registers for &mut T {
    fn read(&mut self, reg: Register) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Register, value: u32) {
        (**self).write(reg, value)
    }
}

/// Direct volatile access to the physical register file.
///
/// Only meaningful when running on the RDA5981 itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mmio;

impl Registers for Mmio {
    fn read(&mut self, reg: Register) -> u32 {
        // SAFETY: every `Register` constant names a word-aligned register of
        // the RDA5981 that is always readable.
        unsafe { core::ptr::read_volatile(reg.0 as usize as *const u32) }
    }

    fn write(&mut self, reg: Register, value: u32) {
        // SAFETY: as above; the driver owns these registers for the session.
        unsafe { core::ptr::write_volatile(reg.0 as usize as *mut u32, value) }
    }
}
