use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("PRG ROM must be 16 KiB or 32 KiB, got {0} bytes")]
    InvalidPrgSize(usize),
    #[error("CHR ROM must be empty (CHR RAM) or 8 KiB, got {0} bytes")]
    InvalidChrSize(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    OneScreenLower,
    OneScreenUpper,
}

impl Mirroring {
    /// Maps a nametable address ($2000-$3EFF) to an index into the PPU's
    /// 2 KiB of VRAM.
    pub fn vram_index(self, addr: u16) -> usize {
        let addr = addr & 0x0FFF;
        let table = addr / 0x0400;
        let offset = addr & 0x03FF;
        let bank = match self {
            // $2000/$2400 -> NT0, $2800/$2C00 -> NT1
            Mirroring::Horizontal => table >> 1,
            // $2000/$2800 -> NT0, $2400/$2C00 -> NT1
            Mirroring::Vertical => table & 1,
            Mirroring::OneScreenLower => 0,
            Mirroring::OneScreenUpper => 1,
        };
        (bank * 0x0400 + offset) as usize
    }
}

/// Cartridge as seen from both address spaces. Bank switching, if any, is
/// entirely the implementor's business.
pub trait Cartridge {
    /// CPU read in $4020-$FFFF. `None` means the cartridge does not drive the
    /// bus and the open-bus value is returned instead.
    fn cpu_read(&mut self, addr: u16) -> Option<u8>;
    fn cpu_write(&mut self, addr: u16, value: u8);
    /// PPU pattern memory read in $0000-$1FFF.
    fn ppu_read(&mut self, addr: u16) -> u8;
    fn ppu_write(&mut self, addr: u16, value: u8);
    /// Side-effect free pattern memory read, for introspection.
    fn ppu_peek(&self, addr: u16) -> u8;
    /// Currently mapped 8 KiB of pattern memory.
    fn chr(&self) -> &[u8];
    fn mirroring(&self) -> Mirroring;
    fn irq_pending(&self) -> bool {
        false
    }
}

/// Mapper 0: fixed 16/32 KiB PRG ROM, 8 KiB CHR ROM or RAM and 8 KiB PRG RAM.
pub struct NromCartridge {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    has_chr_ram: bool,
    prg_ram: [u8; 0x2000],
    mirroring: Mirroring,
}

impl NromCartridge {
    /// An empty `chr_rom` gives the board 8 KiB of CHR RAM.
    pub fn new(
        prg_rom: Vec<u8>,
        chr_rom: Vec<u8>,
        mirroring: Mirroring,
    ) -> Result<Self, CartridgeError> {
        if prg_rom.len() != 0x4000 && prg_rom.len() != 0x8000 {
            return Err(CartridgeError::InvalidPrgSize(prg_rom.len()));
        }
        let has_chr_ram = chr_rom.is_empty();
        if !has_chr_ram && chr_rom.len() != 0x2000 {
            return Err(CartridgeError::InvalidChrSize(chr_rom.len()));
        }
        let chr = if has_chr_ram { vec![0; 0x2000] } else { chr_rom };

        log::debug!(
            "NROM: PRG {} KiB, CHR {} ({:?} mirroring)",
            prg_rom.len() / 1024,
            if has_chr_ram { "RAM" } else { "ROM" },
            mirroring
        );

        Ok(Self {
            prg_rom,
            chr,
            has_chr_ram,
            prg_ram: [0; 0x2000],
            mirroring,
        })
    }
}

impl Cartridge for NromCartridge {
    fn cpu_read(&mut self, addr: u16) -> Option<u8> {
        match addr {
            0x6000..=0x7FFF => Some(self.prg_ram[(addr - 0x6000) as usize]),
            // 16 KiB boards mirror $8000 into $C000
            0x8000..=0xFFFF => Some(self.prg_rom[(addr - 0x8000) as usize % self.prg_rom.len()]),
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        if let 0x6000..=0x7FFF = addr {
            self.prg_ram[(addr - 0x6000) as usize] = value;
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.ppu_peek(addr)
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        // CHR ROM is read-only
        if self.has_chr_ram {
            self.chr[(addr & 0x1FFF) as usize] = value;
        }
    }

    fn ppu_peek(&self, addr: u16) -> u8 {
        self.chr[(addr & 0x1FFF) as usize]
    }

    fn chr(&self) -> &[u8] {
        &self.chr
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
