//! Flash routines provided by the RDA5981 boot ROM.
//!
//! The ROM exports no symbol table; each routine lives at a fixed Thumb
//! address of the shipping chip revision (revision 4). The addresses are a
//! private ABI and must not change for this silicon.

/// Opaque flash procedures the algorithm delegates to.
pub trait RomRoutines {
    /// Spin until the flash controller reports idle.
    fn wait_busy_down(&mut self);

    /// Set the write enable latch on the attached part.
    fn spi_write_reset(&mut self);

    /// Wait out any write in progress on the attached part.
    fn spi_wip_reset(&mut self);

    /// Erase the 4 KiB sector containing `addr` (flash offset).
    fn erase_sector(&mut self, addr: u32);

    /// Program `data` at flash offset `addr`.
    fn write(&mut self, addr: u32, data: &[u8]);

    /// Drop stale lines from the read cache.
    fn flush_cache(&mut self);

    /// Read from flash offset `addr` into `buf` through the cache.
    fn read(&mut self, addr: u32, buf: &mut [u8]);
}

impl<T: RomRoutines + ?Sized> RomRoutines for &mut T {
    fn wait_busy_down(&mut self) {
        (**self).wait_busy_down()
    }

    fn spi_write_reset(&mut self) {
        (**self).spi_write_reset()
    }

    fn spi_wip_reset(&mut self) {
        (**self).spi_wip_reset()
    }

    fn erase_sector(&mut self, addr: u32) {
        (**self).erase_sector(addr)
    }

    fn write(&mut self, addr: u32, data: &[u8]) {
        (**self).write(addr, data)
    }

    fn flush_cache(&mut self) {
        (**self).flush_cache()
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        (**self).read(addr, buf)
    }
}

const WAIT_BUSY_DOWN: usize = 0x1db1;
const SPI_WIP_RESET: usize = 0x1dbb;
const SPI_WRITE_RESET: usize = 0x1dcf;
const FLUSH_CACHE: usize = 0x1efd;
const READ_DATA: usize = 0x2037;
const WRITE: usize = 0x2271;
const ERASE_4K_SECTOR: usize = 0x23d3;

type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32);
type RomFnWrite = unsafe extern "C" fn(u32, *const u8, u32);
type RomFnRead = unsafe extern "C" fn(*mut u8, *const u8, u32);

/// Calls straight into the boot ROM.
#[derive(Clone, Copy, Debug, Default)]
pub struct BootRom;

impl BootRom {
    fn call(addr: usize) {
        // SAFETY: `addr` is one of the void ROM entry points above, present on
        // every revision-4 part this algorithm is loaded onto.
        unsafe {
            let f = core::mem::transmute::<usize, RomFnVoid>(addr);
            f()
        }
    }
}

impl RomRoutines for BootRom {
    fn wait_busy_down(&mut self) {
        Self::call(WAIT_BUSY_DOWN)
    }

    fn spi_write_reset(&mut self) {
        Self::call(SPI_WRITE_RESET)
    }

    fn spi_wip_reset(&mut self) {
        Self::call(SPI_WIP_RESET)
    }

    fn erase_sector(&mut self, addr: u32) {
        // SAFETY: fixed ROM routine taking a flash offset.
        unsafe {
            let f = core::mem::transmute::<usize, RomFnErase>(ERASE_4K_SECTOR);
            f(addr)
        }
    }

    fn write(&mut self, addr: u32, data: &[u8]) {
        // SAFETY: the ROM only reads `data.len()` bytes from the slice.
        unsafe {
            let f = core::mem::transmute::<usize, RomFnWrite>(WRITE);
            f(addr, data.as_ptr(), data.len() as u32)
        }
    }

    fn flush_cache(&mut self) {
        Self::call(FLUSH_CACHE)
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        // SAFETY: the ROM writes at most `buf.len()` bytes. The source is a
        // flash offset the ROM translates itself, not a dereferenceable pointer.
        unsafe {
            let f = core::mem::transmute::<usize, RomFnRead>(READ_DATA);
            f(buf.as_mut_ptr(), addr as usize as *const u8, buf.len() as u32)
        }
    }
}
