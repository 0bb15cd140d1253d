// CPU instruction tracing in nestest log layout

use crate::cpu::{ExecutedOpcode, Registers};
use crate::opcode::{AddressingMode, Opcode};

/// Instruction disassembly. `pc` is the address of the opcode byte, used to
/// resolve branch targets.
pub fn disassemble(opcode: &Opcode, operands: &[u8; 2], pc: u16) -> String {
    let mnemonic = opcode.instruction.mnemonic();
    let byte = operands[0];
    let word = u16::from_le_bytes(*operands);

    match opcode.mode {
        AddressingMode::Implied => mnemonic.to_string(),
        AddressingMode::Accumulator => format!("{} A", mnemonic),
        AddressingMode::Immediate => format!("{} #${:02X}", mnemonic, byte),
        AddressingMode::ZeroPage => format!("{} ${:02X}", mnemonic, byte),
        AddressingMode::ZeroPageX => format!("{} ${:02X},X", mnemonic, byte),
        AddressingMode::ZeroPageY => format!("{} ${:02X},Y", mnemonic, byte),
        AddressingMode::Absolute => format!("{} ${:04X}", mnemonic, word),
        AddressingMode::AbsoluteXIndexed => format!("{} ${:04X},X", mnemonic, word),
        AddressingMode::AbsoluteYIndexed => format!("{} ${:04X},Y", mnemonic, word),
        AddressingMode::Indirect => format!("{} (${:04X})", mnemonic, word),
        AddressingMode::IndirectX => format!("{} (${:02X},X)", mnemonic, byte),
        AddressingMode::IndirectY => format!("{} (${:02X}),Y", mnemonic, byte),
        AddressingMode::Relative => {
            let target = pc.wrapping_add(2).wrapping_add(byte as i8 as u16);
            format!("{} ${:04X}", mnemonic, target)
        }
    }
}

/// `C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD CYC:7`
///
/// Registers are the values before the instruction ran.
pub fn format_line(executed: &ExecutedOpcode, before: &Registers) -> String {
    let opcode = Opcode::decode(executed.opcode);
    let operand_len = (opcode.length as usize).saturating_sub(1);

    let mut bytes = format!("{:02X}", executed.opcode);
    for operand in &executed.operands[..operand_len] {
        bytes.push_str(&format!(" {:02X}", operand));
    }

    format!(
        "{:04X}  {:<8}  {:<32}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
        executed.pc,
        bytes,
        disassemble(&opcode, &executed.operands, executed.pc),
        before.a,
        before.x,
        before.y,
        before.status,
        before.sp,
        executed.cycle
    )
}
