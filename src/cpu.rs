use std::collections::VecDeque;

use thiserror::Error;

use crate::opcode::{AddressingMode, Instruction, Opcode};
use crate::trace;

// Status flags
pub const FLAG_C: u8 = 0x01; // Carry
pub const FLAG_Z: u8 = 0x02; // Zero
pub const FLAG_I: u8 = 0x04; // Interrupt Disable
pub const FLAG_D: u8 = 0x08; // Decimal Mode (unused on NES)
pub const FLAG_B: u8 = 0x10; // Break
pub const FLAG_U: u8 = 0x20; // Unused (always 1 when pushed)
pub const FLAG_V: u8 = 0x40; // Overflow
pub const FLAG_N: u8 = 0x80; // Negative

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Everything the processor needs from the system. Each `read`, `write` and
/// `tick` is exactly one CPU cycle.
pub trait CpuBus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);
    /// A cycle in which the CPU does nothing the rest of the system can see.
    fn tick(&mut self);
    /// CPU cycles elapsed since power-on.
    fn cycles(&self) -> u64;
    /// Returns and clears a pending NMI request.
    fn poll_nmi(&mut self) -> bool;
    /// Level of the shared IRQ line.
    fn irq_asserted(&self) -> bool;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    #[error("CPU jammed by opcode ${opcode:02X} at ${pc:04X}")]
    Jammed { opcode: u8, pc: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub status: u8,
}

/// One entry of the execution history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutedOpcode {
    pub pc: u16,
    pub opcode: u8,
    /// Operand bytes as fetched; only the first `length - 1` are meaningful.
    pub operands: [u8; 2],
    /// CPU cycle on which the opcode fetch happened.
    pub cycle: u64,
}

#[derive(Debug, Clone, Copy)]
enum Operand {
    None,
    Accumulator,
    Immediate(u8),
    Address(u16),
}

#[derive(Debug, Clone)]
pub struct Cpu {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub status: u8,
    jammed: Option<CpuError>,
    history: VecDeque<ExecutedOpcode>,
    history_len: usize,
    // Bookkeeping for the instruction in flight
    ticks: u64,
    operands: [u8; 2],
    operand_count: usize,
}

impl Cpu {
    pub fn new(history_len: usize) -> Self {
        Self {
            pc: 0,
            a: 0,
            x: 0,
            y: 0,
            sp: 0,
            status: FLAG_U | FLAG_I,
            jammed: None,
            history: VecDeque::with_capacity(history_len),
            history_len,
            ticks: 0,
            operands: [0; 2],
            operand_count: 0,
        }
    }

    /// Cold boot: clears the registers and runs the 7-cycle reset sequence
    /// from S = $00, which leaves S at $FD and PC at the reset vector.
    pub fn power_on(&mut self, bus: &mut dyn CpuBus) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0;
        self.status = FLAG_U | FLAG_I;
        self.jammed = None;
        self.history.clear();
        self.reset_sequence(bus);
        log::info!("CPU powered on, PC=${:04X}", self.pc);
    }

    /// Reset button: same sequence as power-on, registers other than S, P
    /// and PC keep their values.
    pub fn reset(&mut self, bus: &mut dyn CpuBus) {
        self.set_flag(FLAG_I, true);
        self.jammed = None;
        self.reset_sequence(bus);
        log::info!("CPU reset, PC=${:04X}", self.pc);
    }

    fn reset_sequence(&mut self, bus: &mut dyn CpuBus) {
        self.idle(bus);
        self.idle(bus);
        // Three pushes with writes suppressed: the bus sees reads, S still moves
        for _ in 0..3 {
            self.read(bus, 0x0100 | self.sp as u16);
            self.sp = self.sp.wrapping_sub(1);
        }
        self.pc = self.read_word(RESET_VECTOR, bus);
    }

    pub fn registers(&self) -> Registers {
        Registers {
            pc: self.pc,
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            status: self.status,
        }
    }

    pub fn jammed(&self) -> Option<CpuError> {
        self.jammed
    }

    /// Most recent last.
    pub fn history(&self) -> &VecDeque<ExecutedOpcode> {
        &self.history
    }

    /// Runs one instruction, or one interrupt sequence if an interrupt is
    /// pending. Returns the CPU cycles spent, including any DMA stall the
    /// instruction triggered.
    pub fn step(&mut self, bus: &mut dyn CpuBus) -> Result<u64, CpuError> {
        if let Some(err) = self.jammed {
            return Err(err);
        }

        let start = bus.cycles();

        if bus.poll_nmi() {
            log::trace!("NMI at ${:04X} CYC:{}", self.pc, start);
            self.interrupt(NMI_VECTOR, bus);
            return Ok(bus.cycles() - start);
        }
        if bus.irq_asserted() && !self.get_flag(FLAG_I) {
            log::trace!("IRQ at ${:04X} CYC:{}", self.pc, start);
            self.interrupt(IRQ_VECTOR, bus);
            return Ok(bus.cycles() - start);
        }

        let before = self.registers();
        self.ticks = 0;
        self.operands = [0; 2];
        self.operand_count = 0;

        let code = self.read(bus, self.pc);
        let opcode = Opcode::decode(code);
        if opcode.is_jam() {
            let err = CpuError::Jammed { opcode: code, pc: before.pc };
            log::error!("{}", err);
            self.jammed = Some(err);
            return Err(err);
        }
        self.pc = self.pc.wrapping_add(1);

        let extra = self.execute(&opcode, bus);
        // Cycles not spent on a visible access are internal operations
        let expected = opcode.cycles as u64 + extra;
        while self.ticks < expected {
            self.idle(bus);
        }
        debug_assert_eq!(self.ticks, expected, "{} overran its cycle count", opcode.instruction);

        let executed = ExecutedOpcode {
            pc: before.pc,
            opcode: code,
            operands: self.operands,
            cycle: start,
        };
        self.record(executed);
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", trace::format_line(&executed, &before));
        }

        Ok(bus.cycles() - start)
    }

    fn record(&mut self, executed: ExecutedOpcode) {
        if self.history_len == 0 {
            return;
        }
        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(executed);
    }

    /// NMI/IRQ entry: two internal cycles, three pushes, two vector reads.
    fn interrupt(&mut self, vector: u16, bus: &mut dyn CpuBus) {
        self.idle(bus);
        self.idle(bus);
        self.push_word(self.pc, bus);
        self.push((self.status & !FLAG_B) | FLAG_U, bus);
        self.set_flag(FLAG_I, true);
        self.pc = self.read_word(vector, bus);
    }

    // Bus access; every one of these is a cycle

    fn read(&mut self, bus: &mut dyn CpuBus, addr: u16) -> u8 {
        self.ticks += 1;
        bus.read(addr)
    }

    fn write(&mut self, bus: &mut dyn CpuBus, addr: u16, value: u8) {
        self.ticks += 1;
        bus.write(addr, value);
    }

    fn idle(&mut self, bus: &mut dyn CpuBus) {
        self.ticks += 1;
        bus.tick();
    }

    fn fetch_operand(&mut self, bus: &mut dyn CpuBus) -> u8 {
        let value = self.read(bus, self.pc);
        self.pc = self.pc.wrapping_add(1);
        if self.operand_count < self.operands.len() {
            self.operands[self.operand_count] = value;
            self.operand_count += 1;
        }
        value
    }

    fn fetch_operand_word(&mut self, bus: &mut dyn CpuBus) -> u16 {
        let low = self.fetch_operand(bus) as u16;
        let high = self.fetch_operand(bus) as u16;
        (high << 8) | low
    }

    fn read_word(&mut self, addr: u16, bus: &mut dyn CpuBus) -> u16 {
        let low = self.read(bus, addr) as u16;
        let high = self.read(bus, addr.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    /// Pointer read that stays inside the page of `addr`.
    fn read_word_within_page(&mut self, addr: u16, bus: &mut dyn CpuBus) -> u16 {
        let low = self.read(bus, addr) as u16;
        let high = self.read(bus, (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF)) as u16;
        (high << 8) | low
    }

    fn push(&mut self, value: u8, bus: &mut dyn CpuBus) {
        self.write(bus, 0x0100 | self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop(&mut self, bus: &mut dyn CpuBus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.read(bus, 0x0100 | self.sp as u16)
    }

    fn push_word(&mut self, value: u16, bus: &mut dyn CpuBus) {
        self.push((value >> 8) as u8, bus);
        self.push(value as u8, bus);
    }

    fn pop_word(&mut self, bus: &mut dyn CpuBus) -> u16 {
        let low = self.pop(bus) as u16;
        let high = self.pop(bus) as u16;
        (high << 8) | low
    }

    // Addressing modes

    /// Fetches the operand bytes and resolves the effective address. Returns
    /// the page-cross penalty, if any.
    fn resolve_operand(&mut self, opcode: &Opcode, bus: &mut dyn CpuBus) -> (Operand, u64) {
        let penalty = opcode.instruction.has_page_cross_penalty();
        match opcode.mode {
            AddressingMode::Implied => (Operand::None, 0),
            AddressingMode::Accumulator => (Operand::Accumulator, 0),
            AddressingMode::Immediate | AddressingMode::Relative => {
                (Operand::Immediate(self.fetch_operand(bus)), 0)
            }
            AddressingMode::ZeroPage => (Operand::Address(self.fetch_operand(bus) as u16), 0),
            AddressingMode::ZeroPageX => {
                let base = self.fetch_operand(bus);
                self.idle(bus);
                (Operand::Address(base.wrapping_add(self.x) as u16), 0)
            }
            AddressingMode::ZeroPageY => {
                let base = self.fetch_operand(bus);
                self.idle(bus);
                (Operand::Address(base.wrapping_add(self.y) as u16), 0)
            }
            AddressingMode::Absolute => (Operand::Address(self.fetch_operand_word(bus)), 0),
            AddressingMode::AbsoluteXIndexed => {
                let base = self.fetch_operand_word(bus);
                self.indexed(base, self.x, penalty, bus)
            }
            AddressingMode::AbsoluteYIndexed => {
                let base = self.fetch_operand_word(bus);
                self.indexed(base, self.y, penalty, bus)
            }
            AddressingMode::Indirect => {
                // JMP ($xxFF) takes its high byte from $xx00
                let pointer = self.fetch_operand_word(bus);
                (Operand::Address(self.read_word_within_page(pointer, bus)), 0)
            }
            AddressingMode::IndirectX => {
                let pointer = self.fetch_operand(bus).wrapping_add(self.x);
                self.idle(bus);
                (Operand::Address(self.read_word_within_page(pointer as u16, bus)), 0)
            }
            AddressingMode::IndirectY => {
                let pointer = self.fetch_operand(bus);
                let base = self.read_word_within_page(pointer as u16, bus);
                self.indexed(base, self.y, penalty, bus)
            }
        }
    }

    /// The fix-up cycle is spent when the page is crossed, and always by
    /// instructions that do not take the penalty (stores and read-modify-write).
    fn indexed(&mut self, base: u16, index: u8, penalty: bool, bus: &mut dyn CpuBus) -> (Operand, u64) {
        let addr = base.wrapping_add(index as u16);
        let crossed = (base & 0xFF00) != (addr & 0xFF00);
        if crossed || !penalty {
            self.idle(bus);
        }
        (Operand::Address(addr), (crossed && penalty) as u64)
    }

    fn load(&mut self, operand: Operand, bus: &mut dyn CpuBus) -> u8 {
        match operand {
            Operand::Immediate(value) => value,
            Operand::Address(addr) => self.read(bus, addr),
            Operand::Accumulator => self.a,
            Operand::None => 0,
        }
    }

    fn store(&mut self, operand: Operand, value: u8, bus: &mut dyn CpuBus) {
        if let Operand::Address(addr) = operand {
            self.write(bus, addr, value);
        }
    }

    /// Read, internal cycle, write back. Accumulator mode touches no memory.
    fn modify(&mut self, operand: Operand, bus: &mut dyn CpuBus, op: fn(&mut Self, u8) -> u8) {
        match operand {
            Operand::Address(addr) => {
                let value = self.read(bus, addr);
                self.idle(bus);
                let result = op(self, value);
                self.write(bus, addr, result);
            }
            _ => {
                let value = self.a;
                self.a = op(self, value);
            }
        }
    }

    /// Returns the taken/page-cross penalty.
    fn branch(&mut self, operand: Operand, condition: bool, bus: &mut dyn CpuBus) -> u64 {
        let offset = match operand {
            Operand::Immediate(offset) if condition => offset as i8,
            _ => return 0,
        };
        self.idle(bus);
        let target = self.pc.wrapping_add(offset as u16);
        let crossed = (target & 0xFF00) != (self.pc & 0xFF00);
        self.pc = target;
        if crossed {
            self.idle(bus);
            2
        } else {
            1
        }
    }

    fn execute(&mut self, opcode: &Opcode, bus: &mut dyn CpuBus) -> u64 {
        let (operand, mut extra) = self.resolve_operand(opcode, bus);

        match opcode.instruction {
            // Loads and stores
            Instruction::Lda => {
                self.a = self.load(operand, bus);
                self.update_zero_negative(self.a);
            }
            Instruction::Ldx => {
                self.x = self.load(operand, bus);
                self.update_zero_negative(self.x);
            }
            Instruction::Ldy => {
                self.y = self.load(operand, bus);
                self.update_zero_negative(self.y);
            }
            Instruction::Sta => self.store(operand, self.a, bus),
            Instruction::Stx => self.store(operand, self.x, bus),
            Instruction::Sty => self.store(operand, self.y, bus),

            // Arithmetic and logic
            Instruction::Adc => {
                let value = self.load(operand, bus);
                self.adc(value);
            }
            Instruction::Sbc => {
                let value = self.load(operand, bus);
                self.sbc(value);
            }
            Instruction::And => {
                let value = self.load(operand, bus);
                self.and(value);
            }
            Instruction::Ora => {
                let value = self.load(operand, bus);
                self.ora(value);
            }
            Instruction::Eor => {
                let value = self.load(operand, bus);
                self.eor(value);
            }
            Instruction::Bit => {
                let value = self.load(operand, bus);
                self.bit(value);
            }
            Instruction::Cmp => {
                let value = self.load(operand, bus);
                self.compare(self.a, value);
            }
            Instruction::Cpx => {
                let value = self.load(operand, bus);
                self.compare(self.x, value);
            }
            Instruction::Cpy => {
                let value = self.load(operand, bus);
                self.compare(self.y, value);
            }

            // Read-modify-write
            Instruction::Asl => self.modify(operand, bus, Self::asl),
            Instruction::Lsr => self.modify(operand, bus, Self::lsr),
            Instruction::Rol => self.modify(operand, bus, Self::rol),
            Instruction::Ror => self.modify(operand, bus, Self::ror),
            Instruction::Inc => self.modify(operand, bus, Self::inc),
            Instruction::Dec => self.modify(operand, bus, Self::dec),

            // Register increments and transfers
            Instruction::Inx => {
                self.x = self.x.wrapping_add(1);
                self.update_zero_negative(self.x);
            }
            Instruction::Iny => {
                self.y = self.y.wrapping_add(1);
                self.update_zero_negative(self.y);
            }
            Instruction::Dex => {
                self.x = self.x.wrapping_sub(1);
                self.update_zero_negative(self.x);
            }
            Instruction::Dey => {
                self.y = self.y.wrapping_sub(1);
                self.update_zero_negative(self.y);
            }
            Instruction::Tax => {
                self.x = self.a;
                self.update_zero_negative(self.x);
            }
            Instruction::Tay => {
                self.y = self.a;
                self.update_zero_negative(self.y);
            }
            Instruction::Txa => {
                self.a = self.x;
                self.update_zero_negative(self.a);
            }
            Instruction::Tya => {
                self.a = self.y;
                self.update_zero_negative(self.a);
            }
            Instruction::Tsx => {
                self.x = self.sp;
                self.update_zero_negative(self.x);
            }
            Instruction::Txs => self.sp = self.x,

            // Flags
            Instruction::Clc => self.set_flag(FLAG_C, false),
            Instruction::Sec => self.set_flag(FLAG_C, true),
            Instruction::Cli => self.set_flag(FLAG_I, false),
            Instruction::Sei => self.set_flag(FLAG_I, true),
            Instruction::Cld => self.set_flag(FLAG_D, false),
            Instruction::Sed => self.set_flag(FLAG_D, true),
            Instruction::Clv => self.set_flag(FLAG_V, false),

            // Branches
            Instruction::Bcc => extra += self.branch(operand, !self.get_flag(FLAG_C), bus),
            Instruction::Bcs => extra += self.branch(operand, self.get_flag(FLAG_C), bus),
            Instruction::Bne => extra += self.branch(operand, !self.get_flag(FLAG_Z), bus),
            Instruction::Beq => extra += self.branch(operand, self.get_flag(FLAG_Z), bus),
            Instruction::Bpl => extra += self.branch(operand, !self.get_flag(FLAG_N), bus),
            Instruction::Bmi => extra += self.branch(operand, self.get_flag(FLAG_N), bus),
            Instruction::Bvc => extra += self.branch(operand, !self.get_flag(FLAG_V), bus),
            Instruction::Bvs => extra += self.branch(operand, self.get_flag(FLAG_V), bus),

            // Jumps and subroutines
            Instruction::Jmp => {
                if let Operand::Address(addr) = operand {
                    self.pc = addr;
                }
            }
            Instruction::Jsr => {
                if let Operand::Address(addr) = operand {
                    self.idle(bus);
                    // Pushes the address of the last byte of the JSR
                    self.push_word(self.pc.wrapping_sub(1), bus);
                    self.pc = addr;
                }
            }
            Instruction::Rts => {
                self.pc = self.pop_word(bus).wrapping_add(1);
            }
            Instruction::Rti => {
                let status = self.pop(bus);
                self.restore_status(status);
                self.pc = self.pop_word(bus);
            }
            Instruction::Brk => {
                // The byte after BRK is read and skipped
                self.read(bus, self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.push_word(self.pc, bus);
                self.push(self.status | FLAG_B | FLAG_U, bus);
                self.set_flag(FLAG_I, true);
                self.pc = self.read_word(IRQ_VECTOR, bus);
            }

            // Stack
            Instruction::Pha => self.push(self.a, bus),
            Instruction::Php => self.push(self.status | FLAG_B | FLAG_U, bus),
            Instruction::Pla => {
                self.a = self.pop(bus);
                self.update_zero_negative(self.a);
            }
            Instruction::Plp => {
                let status = self.pop(bus);
                self.restore_status(status);
            }

            Instruction::Nop => {}
            // Rejected in step() before execution
            Instruction::Jam => {}
        }

        extra
    }

    /// PLP/RTI: B does not exist in the register, bit 5 always reads 1.
    fn restore_status(&mut self, value: u8) {
        self.status = (value & !FLAG_B) | FLAG_U;
    }

    // ALU operations
    fn ora(&mut self, value: u8) {
        self.a |= value;
        self.update_zero_negative(self.a);
    }

    fn and(&mut self, value: u8) {
        self.a &= value;
        self.update_zero_negative(self.a);
    }

    fn eor(&mut self, value: u8) {
        self.a ^= value;
        self.update_zero_negative(self.a);
    }

    fn adc(&mut self, value: u8) {
        let carry = if self.get_flag(FLAG_C) { 1 } else { 0 };
        let sum = self.a as u16 + value as u16 + carry;
        let result = sum as u8;

        self.set_flag(FLAG_C, sum > 0xFF);
        self.set_flag(FLAG_V, ((self.a ^ result) & (value ^ result) & 0x80) != 0);
        self.a = result;
        self.update_zero_negative(self.a);
    }

    // A - M - (1 - C) is A + !M + C
    fn sbc(&mut self, value: u8) {
        self.adc(!value);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.set_flag(FLAG_C, register >= value);
        self.update_zero_negative(register.wrapping_sub(value));
    }

    fn bit(&mut self, value: u8) {
        self.set_flag(FLAG_Z, self.a & value == 0);
        self.set_flag(FLAG_N, value & FLAG_N != 0);
        self.set_flag(FLAG_V, value & FLAG_V != 0);
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.set_flag(FLAG_C, value & 0x80 != 0);
        let result = value << 1;
        self.update_zero_negative(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.set_flag(FLAG_C, value & 0x01 != 0);
        let result = value >> 1;
        self.update_zero_negative(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry = self.get_flag(FLAG_C) as u8;
        self.set_flag(FLAG_C, value & 0x80 != 0);
        let result = (value << 1) | carry;
        self.update_zero_negative(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry = if self.get_flag(FLAG_C) { 0x80 } else { 0 };
        self.set_flag(FLAG_C, value & 0x01 != 0);
        let result = (value >> 1) | carry;
        self.update_zero_negative(result);
        result
    }

    fn inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.update_zero_negative(result);
        result
    }

    fn dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.update_zero_negative(result);
        result
    }

    // Flag operations
    pub fn get_flag(&self, flag: u8) -> bool {
        (self.status & flag) != 0
    }

    fn set_flag(&mut self, flag: u8, value: bool) {
        if value {
            self.status |= flag;
        } else {
            self.status &= !flag;
        }
    }

    fn update_zero_negative(&mut self, value: u8) {
        self.set_flag(FLAG_Z, value == 0);
        self.set_flag(FLAG_N, value & 0x80 != 0);
    }
}
