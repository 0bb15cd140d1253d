//! Cycle-accurate NES core: the 2A03 CPU, the 2C02 PPU and the bus that keeps
//! them in lockstep.
//!
//! The cartridge and audio unit are plugged in through the [`Cartridge`] and
//! [`AudioUnit`] traits; [`Emulator`] drives everything one frame at a time.

pub mod apu;
pub mod cartridge;
pub mod config;
pub mod cpu;
pub mod debugger;
pub mod emulator;
pub mod input;
pub mod interrupt;
pub mod memory;
pub mod opcode;
pub mod ppu;
pub mod trace;

pub use apu::{AudioUnit, SilentApu};
pub use cartridge::{Cartridge, CartridgeError, Mirroring, NromCartridge};
pub use config::{BootMode, Config, ConfigError, NESTEST_ENTRY_POINT};
pub use cpu::{Cpu, CpuBus, CpuError};
pub use debugger::Debugger;
pub use emulator::{Emulator, EmulatorError};
pub use input::{ControllerKey, ControllerPort};
pub use memory::MemoryBus;
pub use ppu::Ppu;

pub const NES_WIDTH: usize = 256;
pub const NES_HEIGHT: usize = 240;

/// The PPU runs at exactly three times the CPU clock (NTSC).
pub const PPU_DOTS_PER_CPU_CYCLE: u64 = 3;
/// Odd frames are one dot shorter while rendering.
pub const PPU_DOTS_PER_FRAME: u64 =
    ppu::DOTS_PER_SCANLINE as u64 * ppu::SCANLINES_PER_FRAME as u64;
