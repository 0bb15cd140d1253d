//! Read-only view over a running system for tooling.
//!
//! A [`Debugger`] borrows the emulator, so it cannot outlive the next call
//! that advances emulation.

use crate::cpu::{Cpu, CpuBus, ExecutedOpcode, Registers};
use crate::memory::MemoryBus;
use crate::opcode::Opcode;
use crate::ppu::Ppu;
use crate::trace;

pub struct Debugger<'a> {
    cpu: &'a Cpu,
    bus: &'a MemoryBus,
}

impl<'a> Debugger<'a> {
    pub fn new(cpu: &'a Cpu, bus: &'a MemoryBus) -> Self {
        Self { cpu, bus }
    }

    pub fn cpu(&self) -> &'a Cpu {
        self.cpu
    }

    pub fn registers(&self) -> Registers {
        self.cpu.registers()
    }

    /// Oldest first.
    pub fn history(&self) -> impl Iterator<Item = &'a ExecutedOpcode> + 'a {
        self.cpu.history().iter()
    }

    /// History as `PC  disassembly` lines, oldest first.
    pub fn disassembled_history(&self) -> Vec<String> {
        self.history()
            .map(|executed| {
                let opcode = Opcode::decode(executed.opcode);
                format!(
                    "{:04X}  {}",
                    executed.pc,
                    trace::disassemble(&opcode, &executed.operands, executed.pc)
                )
            })
            .collect()
    }

    pub fn cpu_cycles(&self) -> u64 {
        self.bus.cycles()
    }

    pub fn ram(&self) -> &'a [u8; 0x800] {
        &self.bus.ram
    }

    pub fn ppu(&self) -> &'a Ppu {
        &self.bus.ppu
    }

    /// Pattern table 0 ($0000-$0FFF).
    pub fn left_pattern_table(&self) -> &'a [u8] {
        self.pattern_table(0x0000)
    }

    /// Pattern table 1 ($1000-$1FFF).
    pub fn right_pattern_table(&self) -> &'a [u8] {
        self.pattern_table(0x1000)
    }

    fn pattern_table(&self, start: usize) -> &'a [u8] {
        self.bus.cartridge.chr().get(start..start + 0x1000).unwrap_or(&[])
    }

    pub fn palette(&self) -> &'a [u8; 0x20] {
        &self.bus.ppu.palette
    }

    pub fn oam(&self) -> &'a [u8; 0x100] {
        &self.bus.ppu.oam
    }

    /// The whole PPU address space, $0000-$3FFF, as the PPU would see it.
    pub fn video_memory(&self) -> Vec<u8> {
        (0..0x4000u16)
            .map(|addr| self.bus.ppu.peek_memory(addr, &*self.bus.cartridge))
            .collect()
    }
}
