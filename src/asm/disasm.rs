//! Disassembler for LS-8 programs.
//!
//! Converts machine code back to readable assembly.

use crate::cpu::decode::{decode, Instruction, Opcode};

/// Disassemble the instruction at the start of `bytes`.
///
/// Returns the text and the number of bytes the instruction occupies.
/// Bytes that are not a known opcode are rendered as a `DB` directive.
pub fn disassemble_instruction(bytes: &[u8]) -> (String, usize) {
    let Some(&opcode) = bytes.first() else {
        return (String::new(), 0);
    };

    match decode(opcode, &bytes[1..]) {
        Ok(instr) => (format_instruction(&instr), instr.len()),
        Err(_) => match Opcode::try_from(opcode) {
            // Known opcode, but the operands run past the end.
            Ok(op) => (format!("{} ???", op.mnemonic()), bytes.len()),
            Err(_) => (format!("DB {:#010b}", opcode), 1),
        },
    }
}

/// Disassemble a slice of bytes, one instruction per line.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; LS-8 Disassembly\n");
    output.push_str("; ----------------\n\n");

    for (addr, text, len) in listing(bytes) {
        let raw: Vec<String> = bytes[addr..addr + len]
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect();
        output.push_str(&format!("{:02X}: {:<12} ; {}\n", addr, text, raw.join(" ")));
    }

    output
}

/// Walk `bytes` instruction by instruction, yielding `(address, text, length)`.
pub fn listing(bytes: &[u8]) -> Vec<(usize, String, usize)> {
    let mut lines = Vec::new();
    let mut addr = 0;

    while addr < bytes.len() {
        let (text, len) = disassemble_instruction(&bytes[addr..]);
        lines.push((addr, text, len));
        addr += len;
    }

    lines
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    let mnemonic = instr.opcode().mnemonic();
    match instr {
        Instruction::Hlt | Instruction::Ret => mnemonic.to_string(),

        Instruction::Call { reg }
        | Instruction::Jmp { reg }
        | Instruction::Jeq { reg }
        | Instruction::Jne { reg }
        | Instruction::Prn { reg }
        | Instruction::Push { reg }
        | Instruction::Pop { reg } => format!("{} R{}", mnemonic, reg),

        Instruction::Ldi { reg, imm } => format!("{} R{},{}", mnemonic, reg, imm),

        Instruction::Add { a, b }
        | Instruction::Mul { a, b }
        | Instruction::Cmp { a, b } => format!("{} R{},R{}", mnemonic, a, b),
    }
}
