//! Flash algorithm image loaded into RDA5981 RAM by the debug host.
//!
//! The host looks up `FlashDevice` and the entry points by symbol name, so
//! none of them may be renamed or mangled. The link script must keep them.
#![no_std]
#![no_main]

use core::panic::PanicInfo;
use core::sync::atomic::{AtomicU8, Ordering};

use rda5981_flash_algo::{
    status, BootRom, Calibration, FlashAlgorithm, FlashDeviceDescription, Mmio, DEVICE,
    STATUS_OK,
};

#[allow(non_upper_case_globals)]
#[no_mangle]
#[used]
#[link_section = "DeviceData"]
pub static FlashDevice: FlashDeviceDescription = DEVICE;

const SESSION_NONE: u8 = 0;
const SESSION_SHORT: u8 = 1;
const SESSION_LONG: u8 = 2;

/// Calibration of the running session, kept between entry point calls.
static SESSION: AtomicU8 = AtomicU8::new(SESSION_NONE);

fn algorithm() -> FlashAlgorithm<Mmio, BootRom> {
    let calibration = match SESSION.load(Ordering::Relaxed) {
        SESSION_SHORT => Some(Calibration::ShortStatus),
        SESSION_LONG => Some(Calibration::LongStatus),
        _ => None,
    };
    FlashAlgorithm::resume(Mmio, BootRom, calibration)
}

fn store_session(calibration: Option<Calibration>) {
    let value = match calibration {
        Some(Calibration::ShortStatus) => SESSION_SHORT,
        Some(Calibration::LongStatus) => SESSION_LONG,
        None => SESSION_NONE,
    };
    SESSION.store(value, Ordering::Relaxed);
}

#[no_mangle]
pub extern "C" fn Init(adr: u32, clk: u32, fnc: u32) -> u32 {
    let mut algo = algorithm();
    let result = algo.init(adr, clk, fnc);
    store_session(algo.calibration());
    status(result)
}

#[no_mangle]
pub extern "C" fn UnInit(fnc: u32) -> u32 {
    let mut algo = algorithm();
    let result = algo.uninit(fnc);
    store_session(algo.calibration());
    status(result)
}

#[no_mangle]
pub extern "C" fn BlankCheck(adr: u32, sz: u32, pat: u8) -> u32 {
    status(algorithm().blank_check(adr, sz, pat))
}

#[no_mangle]
pub extern "C" fn EraseChip() -> u32 {
    status(algorithm().erase_chip())
}

#[no_mangle]
pub extern "C" fn EraseSector(adr: u32) -> u32 {
    status(algorithm().erase_sector(adr))
}

/// # Safety
///
/// `buf` must point to `sz` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn ProgramPage(adr: u32, sz: u32, buf: *const u8) -> u32 {
    if sz == 0 {
        return STATUS_OK;
    }
    let data = core::slice::from_raw_parts(buf, sz as usize);
    status(algorithm().program_page(adr, data))
}

/// # Safety
///
/// `buf` must point to `sz` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn Verify(adr: u32, sz: u32, buf: *const u8) -> u32 {
    if sz == 0 {
        return STATUS_OK;
    }
    let expected = core::slice::from_raw_parts(buf, sz as usize);
    status(algorithm().verify(adr, expected))
}

#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    loop {
        core::hint::spin_loop();
    }
}
