use thiserror::Error;

use crate::apu::{AudioUnit, SilentApu};
use crate::cartridge::Cartridge;
use crate::config::{BootMode, Config};
use crate::cpu::{Cpu, CpuError};
use crate::debugger::Debugger;
use crate::input::{ControllerKey, ControllerPort};
use crate::memory::MemoryBus;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmulatorError {
    /// The CPU executed a jam opcode. Only a reset recovers.
    #[error("emulation halted: {0}")]
    Halted(#[from] CpuError),
}

pub struct Emulator {
    cpu: Cpu,
    bus: MemoryBus,
    config: Config,
    pending_input: Vec<(ControllerPort, ControllerKey, bool)>,
}

impl Emulator {
    /// Powers the system on with a silent audio unit.
    pub fn new(cartridge: Box<dyn Cartridge>, config: Config) -> Self {
        Self::with_audio_unit(cartridge, Box::new(SilentApu::new()), config)
    }

    pub fn with_audio_unit(cartridge: Box<dyn Cartridge>, apu: Box<dyn AudioUnit>, config: Config) -> Self {
        let mut bus = MemoryBus::new(cartridge, apu, config.ram_fill);
        let mut cpu = Cpu::new(config.history_len);
        cpu.power_on(&mut bus);
        apply_boot_mode(&mut cpu, config.boot);

        Self {
            cpu,
            bus,
            config,
            pending_input: Vec::new(),
        }
    }

    /// Runs whole instructions until the PPU wraps from the pre-render line
    /// into the next frame. That is 341 x 262 dots, one less on odd frames
    /// while rendering. Dots run past the wrap by the last instruction count
    /// toward the next frame.
    pub fn run_for_one_frame(&mut self) -> Result<(), EmulatorError> {
        if let Some(err) = self.cpu.jammed() {
            return Err(err.into());
        }

        for (port, key, pressed) in self.pending_input.drain(..) {
            self.bus.input.set_key(port, key, pressed);
        }

        let next_frame = self.bus.ppu.frame() + 1;
        while self.bus.ppu.frame() < next_frame {
            self.cpu.step(&mut self.bus).map_err(|err| {
                log::warn!("Emulation halted in frame {}", self.bus.ppu.frame());
                err
            })?;
        }

        log::debug!("Frame {} done, overshoot to dot {}", next_frame, self.bus.ppu.dot());
        Ok(())
    }

    /// Runs one instruction (or interrupt entry) and returns its cycle count.
    pub fn step_instruction(&mut self) -> Result<u64, EmulatorError> {
        Ok(self.cpu.step(&mut self.bus)?)
    }

    /// Reset button. Also clears a jam.
    pub fn reset(&mut self) {
        self.bus.ppu.reset();
        self.cpu.reset(&mut self.bus);
        apply_boot_mode(&mut self.cpu, self.config.boot);
    }

    /// Takes effect at the start of the next frame.
    pub fn controller_press(&mut self, port: ControllerPort, key: ControllerKey) {
        self.pending_input.push((port, key, true));
    }

    pub fn controller_release(&mut self, port: ControllerPort, key: ControllerKey) {
        self.pending_input.push((port, key, false));
    }

    pub fn frame_count(&self) -> u64 {
        self.bus.ppu.frame()
    }

    /// 6-bit palette indices, 256 x 240.
    pub fn framebuffer(&self) -> &[u8] {
        &self.bus.ppu.framebuffer
    }

    pub fn is_halted(&self) -> bool {
        self.cpu.jammed().is_some()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn bus(&self) -> &MemoryBus {
        &self.bus
    }

    /// Direct access for test harnesses and front ends.
    pub fn bus_mut(&mut self) -> &mut MemoryBus {
        &mut self.bus
    }

    pub fn debugger(&self) -> Debugger<'_> {
        Debugger::new(&self.cpu, &self.bus)
    }
}

fn apply_boot_mode(cpu: &mut Cpu, boot: BootMode) {
    if let BootMode::EntryPoint { address } = boot {
        log::info!("Overriding reset vector, starting at ${:04X}", address);
        cpu.pc = address;
    }
}
