use crate::apu::AudioUnit;
use crate::cartridge::Cartridge;
use crate::cpu::CpuBus;
use crate::input::Input;
use crate::interrupt::NmiSignal;
use crate::ppu::Ppu;
use crate::PPU_DOTS_PER_CPU_CYCLE;

/// The CPU address space. Every access costs one CPU cycle, and every CPU
/// cycle clocks the PPU three dots.
pub struct MemoryBus {
    pub ram: [u8; 0x800],
    pub ppu: Ppu,
    pub apu: Box<dyn AudioUnit>,
    pub input: Input,
    pub cartridge: Box<dyn Cartridge>,
    nmi: NmiSignal,
    cycles: u64,
    open_bus: u8, // Last value driven onto the data bus
    pending_dma: Option<u8>,
}

impl MemoryBus {
    pub fn new(cartridge: Box<dyn Cartridge>, apu: Box<dyn AudioUnit>, ram_fill: u8) -> Self {
        log::info!("Nametable mirroring: {:?}", cartridge.mirroring());

        Self {
            ram: [ram_fill; 0x800],
            ppu: Ppu::new(),
            apu,
            input: Input::new(),
            cartridge,
            nmi: NmiSignal::new(),
            cycles: 0,
            open_bus: 0,
            pending_dma: None,
        }
    }

    pub fn open_bus(&self) -> u8 {
        self.open_bus
    }

    pub fn nmi_pending(&self) -> bool {
        self.nmi.is_raised()
    }

    /// Copies `page << 8 ..= page << 8 | 0xFF` into OAM through $2004,
    /// starting at the current OAM address. Returns the CPU cycles spent:
    /// 513, or 514 when started on an odd cycle.
    pub fn perform_oam_dma(&mut self, page: u8) -> u64 {
        let start = self.cycles;
        log::debug!(
            "OAM DMA from ${:02X}00 at cycle {} (OAM address ${:02X})",
            page,
            start,
            self.ppu.oam_addr
        );

        // Halt cycle, plus one alignment cycle when starting on an odd cycle
        self.tick();
        if start % 2 == 1 {
            self.tick();
        }

        let base = (page as u16) << 8;
        for offset in 0..=0xFF {
            let value = self.read(base | offset);
            self.write(0x2004, value);
        }

        self.cycles - start
    }
}

impl CpuBus for MemoryBus {
    fn read(&mut self, addr: u16) -> u8 {
        let value = match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x2000..=0x3FFF => self.ppu.cpu_read(addr, &mut *self.cartridge),
            0x4000..=0x4013 => self.apu.cpu_read(addr),
            0x4014 => self.open_bus,
            // Status bit 5 is not driven; does not update the open bus
            0x4015 => (self.apu.cpu_read(addr) & !0x20) | (self.open_bus & 0x20),
            // Only the low bits are driven by the controllers
            0x4016 | 0x4017 => (self.open_bus & 0xE0) | (self.input.cpu_read(addr) & 0x1F),
            0x4018..=0x401F => self.open_bus,
            0x4020..=0xFFFF => self.cartridge.cpu_read(addr).unwrap_or(self.open_bus),
        };

        if !matches!(addr, 0x4015..=0x4017) {
            self.open_bus = value;
        }
        self.tick();
        value
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.open_bus = value;
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = value,
            0x2000..=0x3FFF => {
                self.ppu
                    .cpu_write(addr, value, &mut *self.cartridge, &mut self.nmi)
            }
            0x4014 => self.pending_dma = Some(value),
            0x4016 => self.input.cpu_write(addr, value),
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.cpu_write(addr, value),
            0x4018..=0x401F => {}
            0x4020..=0xFFFF => self.cartridge.cpu_write(addr, value),
        }
        self.tick();

        // DMA begins once the $4014 write cycle has completed
        if let Some(page) = self.pending_dma.take() {
            self.perform_oam_dma(page);
        }
    }

    fn tick(&mut self) {
        self.cycles += 1;
        for _ in 0..PPU_DOTS_PER_CPU_CYCLE {
            self.ppu.tick(&mut *self.cartridge, &mut self.nmi);
        }
    }

    fn cycles(&self) -> u64 {
        self.cycles
    }

    fn poll_nmi(&mut self) -> bool {
        self.nmi.take()
    }

    fn irq_asserted(&self) -> bool {
        self.apu.irq_pending() || self.cartridge.irq_pending()
    }
}
