//! Host-side stand-in for the RDA5981 flash subsystem.
//!
//! One `SimChip` answers both the register file and the ROM routines, so a
//! `Controller<&SimChip, &SimChip>` sees a single coherent part.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

use crate::device::{FLASH_SIZE, SECTOR_SIZE};
use crate::registers::Register;
use crate::rom::RomRoutines;
use crate::Registers;

/// Fill pattern of a freshly simulated array, so erases are observable.
const UNERASED: u8 = 0x5a;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    WipReset,
    WriteReset,
    WaitBusy,
    Command(u8),
    EraseSector(u32),
    Write(u32, usize),
    FlushCache,
    Read(u32, usize),
}

struct State {
    regs: BTreeMap<Register, u32>,
    register_writes: Vec<(Register, u32)>,
    events: Vec<Event>,
    rx: VecDeque<u32>,
    tx: Vec<u8>,
    jedec: [u8; 3],
    status2: u8,
    status2_masked_reads: u32,
    status_writes: Vec<(u8, Vec<u8>)>,
    write_latch: bool,
    flush_busy_reads: u32,
    flush_reads: u32,
    flash: Vec<u8>,
}

pub struct SimChip {
    state: RefCell<State>,
}

impl SimChip {
    pub fn new(jedec: [u8; 3]) -> Self {
        SimChip {
            state: RefCell::new(State {
                regs: BTreeMap::new(),
                register_writes: Vec::new(),
                events: Vec::new(),
                rx: VecDeque::new(),
                tx: Vec::new(),
                jedec,
                status2: 0,
                status2_masked_reads: 0,
                status_writes: Vec::new(),
                write_latch: false,
                flush_busy_reads: 0,
                flush_reads: 0,
                flash: vec![UNERASED; FLASH_SIZE as usize],
            }),
        }
    }

    pub fn preset(&self, reg: Register, value: u32) {
        self.state.borrow_mut().regs.insert(reg, value);
    }

    pub fn reg(&self, reg: Register) -> u32 {
        self.state.borrow().regs.get(&reg).copied().unwrap_or(0)
    }

    pub fn set_status2(&self, value: u8) {
        self.state.borrow_mut().status2 = value;
    }

    /// The next `reads` status register 2 reads report zero regardless of
    /// what the part holds.
    pub fn delay_unprotect(&self, reads: u32) {
        self.state.borrow_mut().status2_masked_reads = reads;
    }

    /// The cache flush bit reads busy this many times before clearing.
    pub fn set_flush_busy_reads(&self, reads: u32) {
        self.state.borrow_mut().flush_busy_reads = reads;
    }

    pub fn push_rx(&self, words: &[u32]) {
        self.state.borrow_mut().rx.extend(words.iter().copied());
    }

    pub fn flush_reads(&self) -> u32 {
        self.state.borrow().flush_reads
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    pub fn register_writes(&self) -> Vec<(Register, u32)> {
        self.state.borrow().register_writes.clone()
    }

    pub fn registers(&self) -> BTreeMap<Register, u32> {
        self.state.borrow().regs.clone()
    }

    pub fn status_writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.state.borrow().status_writes.clone()
    }

    /// Values written to `FLASH_BLOCK_SIZE`, in order.
    pub fn block_sizes(&self) -> Vec<u32> {
        self.state
            .borrow()
            .register_writes
            .iter()
            .filter(|(reg, _)| *reg == Register::FLASH_BLOCK_SIZE)
            .map(|(_, value)| *value)
            .collect()
    }

    pub fn command_count(&self, opcode: u8) -> usize {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|event| **event == Event::Command(opcode))
            .count()
    }

    pub fn flash(&self, addr: u32, len: usize) -> Vec<u8> {
        let start = addr as usize;
        self.state.borrow().flash[start..start + len].to_vec()
    }

    pub fn flash_is_erased(&self, addr: u32, len: u32) -> bool {
        self.flash(addr, len as usize).iter().all(|&b| b == 0xff)
    }

    /// Overwrite the array directly, bypassing NOR programming rules.
    pub fn poke(&self, addr: u32, data: &[u8]) {
        let start = addr as usize;
        self.state.borrow_mut().flash[start..start + data.len()].copy_from_slice(data);
    }
}

impl State {
    fn command(&mut self, opcode: u8) {
        self.events.push(Event::Command(opcode));
        match opcode {
            0x9f => {
                let id = self.jedec;
                self.rx.extend(id.iter().map(|&b| b as u32));
            }
            0x35 => {
                let value = if self.status2_masked_reads > 0 {
                    self.status2_masked_reads -= 1;
                    0
                } else {
                    self.status2
                };
                self.rx.push_back(value as u32);
            }
            0x01 | 0x31 => {
                let data = core::mem::take(&mut self.tx);
                if self.write_latch {
                    let status2 = if opcode == 0x01 { data.get(1) } else { data.first() };
                    if let Some(&value) = status2 {
                        self.status2 = value;
                    }
                }
                self.status_writes.push((opcode, data));
                self.write_latch = false;
            }
            0x60 => {
                if self.write_latch {
                    self.flash.fill(0xff);
                }
                self.write_latch = false;
            }
            _ => {}
        }
    }
}

impl Registers for &SimChip {
    fn read(&mut self, reg: Register) -> u32 {
        let mut state = self.state.borrow_mut();
        match reg {
            Register::FLASH_RX_FIFO => state.rx.pop_front().unwrap_or(0),
            Register::CACHE_FLUSH => {
                state.flush_reads += 1;
                let stored = state.regs.get(&reg).copied().unwrap_or(0) & !1;
                if state.flush_busy_reads > 0 {
                    state.flush_busy_reads -= 1;
                    stored | 1
                } else {
                    stored
                }
            }
            _ => state.regs.get(&reg).copied().unwrap_or(0),
        }
    }

    fn write(&mut self, reg: Register, value: u32) {
        let mut state = self.state.borrow_mut();
        state.register_writes.push((reg, value));
        match reg {
            Register::FLASH_TX_FIFO => state.tx.push(value as u8),
            Register::FLASH_CMD_ADDR => {
                state.regs.insert(reg, value);
                state.command(value as u8);
            }
            _ => {
                state.regs.insert(reg, value);
            }
        }
    }
}

impl RomRoutines for &SimChip {
    fn wait_busy_down(&mut self) {
        self.state.borrow_mut().events.push(Event::WaitBusy);
    }

    fn spi_write_reset(&mut self) {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::WriteReset);
        state.write_latch = true;
    }

    fn spi_wip_reset(&mut self) {
        self.state.borrow_mut().events.push(Event::WipReset);
    }

    fn erase_sector(&mut self, addr: u32) {
        assert!(addr < FLASH_SIZE, "ROM handed an unmasked address {addr:#x}");
        let mut state = self.state.borrow_mut();
        state.events.push(Event::EraseSector(addr));
        let start = (addr & !(SECTOR_SIZE - 1)) as usize;
        state.flash[start..start + SECTOR_SIZE as usize].fill(0xff);
    }

    fn write(&mut self, addr: u32, data: &[u8]) {
        assert!(addr < FLASH_SIZE, "ROM handed an unmasked address {addr:#x}");
        let mut state = self.state.borrow_mut();
        state.events.push(Event::Write(addr, data.len()));
        let start = addr as usize;
        for (cell, byte) in state.flash[start..start + data.len()].iter_mut().zip(data) {
            *cell &= *byte;
        }
    }

    fn flush_cache(&mut self) {
        self.state.borrow_mut().events.push(Event::FlushCache);
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        assert!(addr < FLASH_SIZE, "ROM handed an unmasked address {addr:#x}");
        let mut state = self.state.borrow_mut();
        state.events.push(Event::Read(addr, buf.len()));
        let start = addr as usize;
        buf.copy_from_slice(&state.flash[start..start + buf.len()]);
    }
}
