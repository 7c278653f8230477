//! Device description read by the debug host before it calls any entry point.
//!
//! The layout is the fixed `FlashDevice` record host tools look up in the
//! `DeviceData` section; field order and widths must not change.

/// Driver version: `0x0100` plus the interface revision.
pub const DRIVER_VERSION: u16 = 0x0101;

/// Physical extent of the SPI flash. Offsets wrap at this size.
pub const FLASH_SIZE: u32 = 0x0010_0000;

pub const SECTOR_SIZE: u32 = 0x1000;

const NAME_LEN: usize = 128;
const MAX_SECTORS: usize = 512;

/// Kind of memory behind the algorithm, as host tools number them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum DeviceType {
    Unknown = 0,
    OnChip = 1,
    Ext8Bit = 2,
    Ext16Bit = 3,
    Ext32Bit = 4,
    ExtSpi = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct FlashSector {
    pub size: u32,
    pub address: u32,
}

impl FlashSector {
    pub const END: FlashSector = FlashSector {
        size: 0xffff_ffff,
        address: 0xffff_ffff,
    };

    const fn empty() -> Self {
        FlashSector {
            size: 0,
            address: 0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct FlashDeviceDescription {
    pub version: u16,
    pub name: [u8; NAME_LEN],
    pub device_type: DeviceType,
    pub start: u32,
    pub size: u32,
    pub page_size: u32,
    _reserved: u32,
    pub erased_value: u8,
    /// Advisory; the algorithm never enforces it.
    pub program_timeout_ms: u32,
    /// Advisory; the algorithm never enforces it.
    pub erase_timeout_ms: u32,
    pub sectors: [FlashSector; MAX_SECTORS],
}

pub const DEVICE: FlashDeviceDescription = FlashDeviceDescription {
    version: DRIVER_VERSION,
    name: name(b"RDA5981 1MB Flash"),
    device_type: DeviceType::OnChip,
    start: 0x1800_1000,
    size: 0x000f_f000,
    page_size: 0x1000,
    _reserved: 0,
    erased_value: 0xff,
    program_timeout_ms: 100,
    erase_timeout_ms: 30_000,
    sectors: sectors(&[FlashSector {
        size: SECTOR_SIZE,
        address: 0,
    }]),
};

const fn name(text: &[u8]) -> [u8; NAME_LEN] {
    assert!(text.len() < NAME_LEN);
    let mut out = [0u8; NAME_LEN];
    let mut i = 0;
    while i < text.len() {
        out[i] = text[i];
        i += 1;
    }
    out
}

const fn sectors(layout: &[FlashSector]) -> [FlashSector; MAX_SECTORS] {
    assert!(layout.len() < MAX_SECTORS);
    let mut out = [FlashSector::empty(); MAX_SECTORS];
    let mut i = 0;
    while i < layout.len() {
        out[i] = layout[i];
        i += 1;
    }
    out[i] = FlashSector::END;
    out
}

impl FlashDeviceDescription {
    /// Display name up to the first NUL.
    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..len]).unwrap_or("")
    }

    /// Sector map entries before the terminator.
    pub fn sectors(&self) -> impl Iterator<Item = &FlashSector> {
        self.sectors.iter().take_while(|s| **s != FlashSector::END)
    }

    /// Size of the sector containing `offset` (relative to `start`).
    pub fn sector_size_at(&self, offset: u32) -> Option<u32> {
        if offset >= self.size {
            return None;
        }
        self.sectors()
            .filter(|s| s.address <= offset)
            .last()
            .map(|s| s.size)
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr - self.start < self.size
    }
}

/// Wrap `addr` into the flash's offset space.
pub const fn mask_address(addr: u32) -> u32 {
    addr & (FLASH_SIZE - 1)
}
