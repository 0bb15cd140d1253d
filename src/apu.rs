/// The APU as seen from the CPU bus: $4000-$4013, $4015 and the $4017 frame
/// counter write.
pub trait AudioUnit {
    fn cpu_read(&mut self, addr: u16) -> u8;
    fn cpu_write(&mut self, addr: u16, value: u8);
    fn irq_pending(&self) -> bool {
        false
    }
}

/// Register-level stand-in that produces no sound.
///
/// Writes are latched so the last value of every register stays observable.
/// With no length counters running, $4015 always reads back idle and the
/// frame counter never asserts IRQ.
#[derive(Debug, Clone)]
pub struct SilentApu {
    registers: [u8; 0x18],
}

impl SilentApu {
    pub fn new() -> Self {
        Self { registers: [0; 0x18] }
    }

    pub fn register(&self, addr: u16) -> u8 {
        self.registers[register_index(addr)]
    }
}

// $4000-$4017 mirrored over any address
fn register_index(addr: u16) -> usize {
    (addr as usize & 0x1F) % 0x18
}

impl Default for SilentApu {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioUnit for SilentApu {
    fn cpu_read(&mut self, _addr: u16) -> u8 {
        0
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        log::trace!("APU write ${:04X} = ${:02X}", addr, value);
        self.registers[register_index(addr)] = value;
    }
}
