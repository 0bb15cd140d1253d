#![allow(dead_code)]

use nesium_core::{Config, Emulator, MemoryBus, Mirroring, NromCartridge, SilentApu};

/// Builds a 32 KiB NROM image. The program starts at $8000 and all three
/// vectors point there unless overridden.
pub struct Rom {
    prg: Vec<u8>,
}

impl Rom {
    pub fn new(program: &[u8]) -> Self {
        Self { prg: vec![0xEA; 0x8000] }
            .at(0x8000, program)
            .vector(0xFFFA, 0x8000)
            .vector(0xFFFC, 0x8000)
            .vector(0xFFFE, 0x8000)
    }

    pub fn at(mut self, addr: u16, bytes: &[u8]) -> Self {
        let offset = (addr - 0x8000) as usize;
        self.prg[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn vector(self, vector: u16, target: u16) -> Self {
        self.at(vector, &target.to_le_bytes())
    }

    pub fn nmi_handler(self, target: u16) -> Self {
        self.vector(0xFFFA, target)
    }

    pub fn reset_vector(self, target: u16) -> Self {
        self.vector(0xFFFC, target)
    }

    pub fn cartridge(self) -> NromCartridge {
        NromCartridge::new(self.prg, vec![], Mirroring::Vertical).unwrap()
    }

    pub fn emulator(self, config: Config) -> Emulator {
        Emulator::new(Box::new(self.cartridge()), config)
    }

    pub fn bus(self) -> MemoryBus {
        MemoryBus::new(Box::new(self.cartridge()), Box::new(SilentApu::new()), 0)
    }
}

/// Config with zeroed RAM so counters in tests start at 0.
pub fn zeroed_ram() -> Config {
    Config {
        ram_fill: 0,
        ..Config::default()
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
