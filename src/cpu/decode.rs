//! Instruction set and decoder for the LS-8.
//!
//! Every opcode byte follows the layout `AABCDDDD`:
//! - `AA`: number of operand bytes that follow (0-2)
//! - `B`: 1 if the instruction is carried out by the ALU
//! - `C`: 1 if the instruction sets the PC itself
//! - `DDDD`: instruction identifier
//!
//! The set is closed: thirteen opcodes, nothing else decodes.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The LS-8 opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Hlt = 0b0000_0001,
    Ldi = 0b1000_0010,
    Prn = 0b0100_0111,
    Add = 0b1010_0000,
    Mul = 0b1010_0010,
    Push = 0b0100_0101,
    Pop = 0b0100_0110,
    Call = 0b0101_0000,
    Ret = 0b0001_0001,
    Cmp = 0b1010_0111,
    Jmp = 0b0101_0100,
    Jeq = 0b0101_0101,
    Jne = 0b0101_0110,
}

/// Static properties of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub mnemonic: &'static str,
    /// Operand bytes following the opcode.
    pub operands: usize,
    /// Handled by the ALU.
    pub alu: bool,
    /// The handler owns the PC for this step.
    pub sets_pc: bool,
}

impl Opcode {
    /// Every opcode, in table order.
    pub const ALL: [Opcode; 13] = [
        Opcode::Hlt,
        Opcode::Ldi,
        Opcode::Prn,
        Opcode::Add,
        Opcode::Mul,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Call,
        Opcode::Ret,
        Opcode::Cmp,
        Opcode::Jmp,
        Opcode::Jeq,
        Opcode::Jne,
    ];

    /// The raw opcode byte.
    #[inline]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Assembly mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "HLT",
            Opcode::Ldi => "LDI",
            Opcode::Prn => "PRN",
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Cmp => "CMP",
            Opcode::Jmp => "JMP",
            Opcode::Jeq => "JEQ",
            Opcode::Jne => "JNE",
        }
    }

    /// Number of operand bytes, read from the top two bits.
    #[inline]
    pub const fn operand_count(self) -> usize {
        (self.byte() >> 6) as usize
    }

    /// Decoded view of the opcode's bit fields.
    pub const fn info(self) -> OpcodeInfo {
        OpcodeInfo {
            mnemonic: self.mnemonic(),
            operands: self.operand_count(),
            alu: self.byte() & 0b0010_0000 != 0,
            sets_pc: self.byte() & 0b0001_0000 != 0,
        }
    }

    /// Look up an opcode by mnemonic (case-insensitive).
    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(mnemonic))
    }
}

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.byte() == byte)
            .ok_or(DecodeError::UnknownOpcode(byte))
    }
}

/// A decoded LS-8 instruction.
///
/// Register operands are kept as raw bytes; they are checked against the
/// register file when the instruction executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Control ====================

    /// Halt the CPU.
    Hlt,

    /// Call the subroutine at the address in `reg`.
    Call { reg: u8 },

    /// Return from a subroutine.
    Ret,

    /// Jump to the address in `reg`.
    Jmp { reg: u8 },

    /// Jump to the address in `reg` if the E flag is set.
    Jeq { reg: u8 },

    /// Jump to the address in `reg` if the E flag is clear.
    Jne { reg: u8 },

    // ==================== Data ====================

    /// Load immediate: `reg := imm`.
    Ldi { reg: u8, imm: u8 },

    /// Print the decimal value of `reg`.
    Prn { reg: u8 },

    /// Push `reg` onto the stack.
    Push { reg: u8 },

    /// Pop the top of the stack into `reg`.
    Pop { reg: u8 },

    // ==================== ALU ====================

    /// `a := a + b` (mod 256)
    Add { a: u8, b: u8 },

    /// `a := a * b` (mod 256)
    Mul { a: u8, b: u8 },

    /// Compare `a` with `b` and set FL.
    Cmp { a: u8, b: u8 },
}

impl Instruction {
    /// The opcode this instruction encodes to.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Instruction::Hlt => Opcode::Hlt,
            Instruction::Call { .. } => Opcode::Call,
            Instruction::Ret => Opcode::Ret,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Jeq { .. } => Opcode::Jeq,
            Instruction::Jne { .. } => Opcode::Jne,
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Prn { .. } => Opcode::Prn,
            Instruction::Push { .. } => Opcode::Push,
            Instruction::Pop { .. } => Opcode::Pop,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Mul { .. } => Opcode::Mul,
            Instruction::Cmp { .. } => Opcode::Cmp,
        }
    }

    /// Encoded length in bytes, opcode included.
    pub const fn len(&self) -> usize {
        1 + self.opcode().operand_count()
    }
}

/// Decode an instruction from its opcode byte and the bytes following it.
///
/// `operands` may be longer than needed; only the declared number of
/// operand bytes is consumed.
pub fn decode(opcode: u8, operands: &[u8]) -> Result<Instruction, DecodeError> {
    let op = Opcode::try_from(opcode)?;
    let expected = op.operand_count();
    if operands.len() < expected {
        return Err(DecodeError::MissingOperands {
            opcode: op,
            expected,
            found: operands.len(),
        });
    }

    let instruction = match op {
        Opcode::Hlt => Instruction::Hlt,
        Opcode::Ret => Instruction::Ret,
        Opcode::Call => Instruction::Call { reg: operands[0] },
        Opcode::Jmp => Instruction::Jmp { reg: operands[0] },
        Opcode::Jeq => Instruction::Jeq { reg: operands[0] },
        Opcode::Jne => Instruction::Jne { reg: operands[0] },
        Opcode::Prn => Instruction::Prn { reg: operands[0] },
        Opcode::Push => Instruction::Push { reg: operands[0] },
        Opcode::Pop => Instruction::Pop { reg: operands[0] },
        Opcode::Ldi => Instruction::Ldi { reg: operands[0], imm: operands[1] },
        Opcode::Add => Instruction::Add { a: operands[0], b: operands[1] },
        Opcode::Mul => Instruction::Mul { a: operands[0], b: operands[1] },
        Opcode::Cmp => Instruction::Cmp { a: operands[0], b: operands[1] },
    };

    Ok(instruction)
}

/// Encode an instruction to its byte representation.
pub fn encode(instr: &Instruction) -> Vec<u8> {
    let mut bytes = vec![instr.opcode().byte()];
    match *instr {
        Instruction::Hlt | Instruction::Ret => {}
        Instruction::Call { reg }
        | Instruction::Jmp { reg }
        | Instruction::Jeq { reg }
        | Instruction::Jne { reg }
        | Instruction::Prn { reg }
        | Instruction::Push { reg }
        | Instruction::Pop { reg } => bytes.push(reg),
        Instruction::Ldi { reg, imm } => bytes.extend([reg, imm]),
        Instruction::Add { a, b }
        | Instruction::Mul { a, b }
        | Instruction::Cmp { a, b } => bytes.extend([a, b]),
    }
    bytes
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {0:#010b}")]
    UnknownOpcode(u8),

    #[error("{} expects {expected} operand(s), found {found}", .opcode.mnemonic())]
    MissingOperands { opcode: Opcode, expected: usize, found: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_bytes() {
        assert_eq!(Opcode::Hlt.byte(), 0b0000_0001);
        assert_eq!(Opcode::Ldi.byte(), 0b1000_0010);
        assert_eq!(Opcode::Prn.byte(), 0b0100_0111);
        assert_eq!(Opcode::Jne.byte(), 0b0101_0110);
    }

    #[test]
    fn test_operand_counts_match_table() {
        let expected = [
            (Opcode::Hlt, 0),
            (Opcode::Ldi, 2),
            (Opcode::Prn, 1),
            (Opcode::Add, 2),
            (Opcode::Mul, 2),
            (Opcode::Push, 1),
            (Opcode::Pop, 1),
            (Opcode::Call, 1),
            (Opcode::Ret, 0),
            (Opcode::Cmp, 2),
            (Opcode::Jmp, 1),
            (Opcode::Jeq, 1),
            (Opcode::Jne, 1),
        ];
        for (op, count) in expected {
            assert_eq!(op.operand_count(), count, "{}", op.mnemonic());
        }
    }

    #[test]
    fn test_sets_pc_bit() {
        let branching = [Opcode::Call, Opcode::Ret, Opcode::Jmp, Opcode::Jeq, Opcode::Jne];
        for op in Opcode::ALL {
            assert_eq!(op.info().sets_pc, branching.contains(&op), "{}", op.mnemonic());
        }
    }

    #[test]
    fn test_alu_bit() {
        for op in Opcode::ALL {
            let expected = matches!(op, Opcode::Add | Opcode::Mul | Opcode::Cmp);
            assert_eq!(op.info().alu, expected, "{}", op.mnemonic());
        }
    }

    #[test]
    fn test_every_opcode_roundtrips_through_byte() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::try_from(op.byte()), Ok(op));
        }
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(Opcode::try_from(0), Err(DecodeError::UnknownOpcode(0)));
        assert_eq!(decode(0xFF, &[]), Err(DecodeError::UnknownOpcode(0xFF)));
    }

    #[test]
    fn test_from_mnemonic() {
        assert_eq!(Opcode::from_mnemonic("ldi"), Some(Opcode::Ldi));
        assert_eq!(Opcode::from_mnemonic("PUSH"), Some(Opcode::Push));
        assert_eq!(Opcode::from_mnemonic("SUB"), None);
    }

    #[test]
    fn test_decode_ldi() {
        let instr = decode(0b1000_0010, &[0, 8]).unwrap();
        assert_eq!(instr, Instruction::Ldi { reg: 0, imm: 8 });
        assert_eq!(instr.len(), 3);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let instr = decode(Opcode::Hlt.byte(), &[0xAA, 0xBB]).unwrap();
        assert_eq!(instr, Instruction::Hlt);
        assert_eq!(instr.len(), 1);
    }

    #[test]
    fn test_decode_missing_operands() {
        let err = decode(Opcode::Mul.byte(), &[1]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingOperands { opcode: Opcode::Mul, expected: 2, found: 1 }
        );
        assert_eq!(err.to_string(), "MUL expects 2 operand(s), found 1");
    }

    #[test]
    fn test_encode_lengths() {
        let cases = [
            Instruction::Hlt,
            Instruction::Ret,
            Instruction::Prn { reg: 1 },
            Instruction::Ldi { reg: 2, imm: 250 },
            Instruction::Cmp { a: 0, b: 1 },
        ];
        for instr in cases {
            let bytes = encode(&instr);
            assert_eq!(bytes.len(), instr.len());
            assert_eq!(bytes[0], instr.opcode().byte());
            assert_eq!(decode(bytes[0], &bytes[1..]).unwrap(), instr);
        }
    }
}
