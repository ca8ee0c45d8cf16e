//! Two-pass assembler for LS-8 programs.
//!
//! Syntax:
//! ```text
//! ; Comment (`#` works too)
//!         LDI R0, 8       ; Load immediate
//!         LDI R1, PRINT   ; Labels resolve to their address
//!         CALL R1
//!         HLT
//! PRINT:  PRN R0
//!         RET
//!         DB 0x2A         ; Raw data byte
//! ```
//!
//! Immediates may be decimal, `0x` hex, `0b` binary, or a label.

use std::collections::HashMap;
use thiserror::Error;
use crate::cpu::decode::{encode, Instruction, Opcode};

/// Assemble source code to machine code.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// A parsed line that produces output.
#[derive(Debug)]
enum Statement {
    Op { opcode: Opcode, operands: Vec<String> },
    Data(String),
}

/// The assembler state.
struct Assembler {
    /// Address of the next emitted byte.
    current_addr: usize,
    /// Symbol table (label -> address).
    symbols: HashMap<String, usize>,
    /// Statements collected in pass 1, with their source line.
    statements: Vec<(usize, Statement)>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            current_addr: 0,
            symbols: HashMap::new(),
            statements: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Pass 1: assign addresses to labels
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: emit bytes with every label known
        let mut output = Vec::with_capacity(self.current_addr);
        for (line_num, statement) in &self.statements {
            match statement {
                Statement::Op { opcode, operands } => {
                    let instr = self.build_instruction(*opcode, operands, *line_num)?;
                    output.extend(encode(&instr));
                }
                Statement::Data(value) => {
                    output.push(self.parse_value(value, *line_num)?);
                }
            }
        }

        Ok(output)
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = line
            .split(|c: char| c == ';' || c == '#')
            .next()
            .unwrap_or_default()
            .trim();

        if line.is_empty() {
            return Ok(());
        }

        // Check for label definition
        let line = if let Some((label, rest)) = line.split_once(':') {
            self.define_label(label.trim(), line_num)?;
            rest.trim()
        } else {
            line
        };

        if line.is_empty() {
            return Ok(());
        }

        self.process_statement(line, line_num)
    }

    fn define_label(&mut self, label: &str, line_num: usize) -> Result<(), AssemblerError> {
        let valid = label
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid label {:?}", label),
            });
        }

        let key = label.to_uppercase();
        if self.symbols.contains_key(&key) {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("duplicate label {}", label),
            });
        }
        self.symbols.insert(key, self.current_addr);
        Ok(())
    }

    fn process_statement(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (mnemonic, rest) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        let operands: Vec<String> = rest
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let mnemonic = mnemonic.to_uppercase();

        // Directives
        if mnemonic == "DB" {
            let [value] = operands.as_slice() else {
                return Err(AssemblerError::ArityMismatch {
                    line: line_num,
                    mnemonic,
                    expected: 1,
                    found: operands.len(),
                });
            };
            self.statements.push((line_num, Statement::Data(value.clone())));
            self.current_addr += 1;
            return Ok(());
        }

        // Instructions
        let opcode = Opcode::from_mnemonic(&mnemonic).ok_or_else(|| {
            AssemblerError::UnknownMnemonic { line: line_num, mnemonic: mnemonic.clone() }
        })?;

        if operands.len() != opcode.operand_count() {
            return Err(AssemblerError::ArityMismatch {
                line: line_num,
                mnemonic,
                expected: opcode.operand_count(),
                found: operands.len(),
            });
        }

        self.current_addr += 1 + opcode.operand_count();
        self.statements.push((line_num, Statement::Op { opcode, operands }));
        Ok(())
    }

    fn build_instruction(&self, opcode: Opcode, operands: &[String], line_num: usize)
        -> Result<Instruction, AssemblerError>
    {
        let reg = |i: usize| parse_register(&operands[i], line_num);

        let instr = match opcode {
            Opcode::Hlt => Instruction::Hlt,
            Opcode::Ret => Instruction::Ret,
            Opcode::Call => Instruction::Call { reg: reg(0)? },
            Opcode::Jmp => Instruction::Jmp { reg: reg(0)? },
            Opcode::Jeq => Instruction::Jeq { reg: reg(0)? },
            Opcode::Jne => Instruction::Jne { reg: reg(0)? },
            Opcode::Prn => Instruction::Prn { reg: reg(0)? },
            Opcode::Push => Instruction::Push { reg: reg(0)? },
            Opcode::Pop => Instruction::Pop { reg: reg(0)? },
            Opcode::Ldi => Instruction::Ldi {
                reg: reg(0)?,
                imm: self.parse_value(&operands[1], line_num)?,
            },
            Opcode::Add => Instruction::Add { a: reg(0)?, b: reg(1)? },
            Opcode::Mul => Instruction::Mul { a: reg(0)?, b: reg(1)? },
            Opcode::Cmp => Instruction::Cmp { a: reg(0)?, b: reg(1)? },
        };

        Ok(instr)
    }

    fn parse_value(&self, operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let lower = operand.to_ascii_lowercase();

        let parsed = if let Some(hex) = lower.strip_prefix("0x") {
            i64::from_str_radix(hex, 16).ok()
        } else if let Some(bin) = lower.strip_prefix("0b") {
            i64::from_str_radix(bin, 2).ok()
        } else if lower.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
            lower.parse::<i64>().ok()
        } else {
            let addr = self.symbols.get(&operand.to_uppercase()).ok_or_else(|| {
                AssemblerError::UndefinedLabel { line: line_num, label: operand.to_string() }
            })?;
            Some(*addr as i64)
        };

        let value = parsed.ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid number {:?}", operand),
        })?;

        u8::try_from(value).map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })
    }
}

/// Parse a register name `R0`-`R7` (or `SP` for R7).
fn parse_register(operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
    let upper = operand.to_uppercase();
    let index = match upper.as_str() {
        "SP" => Some(7),
        _ => upper
            .strip_prefix('R')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|&n| n < 8),
    };

    index.ok_or_else(|| AssemblerError::InvalidRegister {
        line: line_num,
        operand: operand.to_string(),
    })
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("invalid register on line {line}: {operand}")]
    InvalidRegister { line: usize, operand: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("{mnemonic} on line {line} takes {expected} operand(s), found {found}")]
    ArityMismatch { line: usize, mnemonic: String, expected: usize, found: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_mult() {
        let source = r#"
            ; mult.ls8
            LDI R0,8
            LDI R1,9
            MUL R0,R1
            PRN R0
            HLT
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(
            result,
            vec![
                0b1000_0010, 0, 8,
                0b1000_0010, 1, 9,
                0b1010_0010, 0, 1,
                0b0100_0111, 0,
                0b0000_0001,
            ]
        );
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
        START:  LDI R1, SUB     # forward reference
                CALL R1
                HLT
        SUB:    RET
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result.len(), 7);
        assert_eq!(result[2], 6);
    }

    #[test]
    fn test_assemble_data() {
        let result = assemble("DB 42\nDB 0x2A\nDB 0b101010\ndb 255").unwrap();
        assert_eq!(result, vec![42, 42, 42, 255]);
    }

    #[test]
    fn test_register_aliases() {
        let result = assemble("push sp\npop r7").unwrap();
        assert_eq!(result, vec![0b0100_0101, 7, 0b0100_0110, 7]);
    }

    #[test]
    fn test_unknown_mnemonic() {
        assert_eq!(
            assemble("HLT\nSUB R0,R1").unwrap_err(),
            AssemblerError::UnknownMnemonic { line: 2, mnemonic: "SUB".into() }
        );
    }

    #[test]
    fn test_arity_mismatch() {
        assert!(matches!(
            assemble("PRN"),
            Err(AssemblerError::ArityMismatch { line: 1, expected: 1, found: 0, .. })
        ));
        assert!(matches!(
            assemble("HLT R0"),
            Err(AssemblerError::ArityMismatch { expected: 0, found: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_register() {
        assert_eq!(
            assemble("PRN R8").unwrap_err(),
            AssemblerError::InvalidRegister { line: 1, operand: "R8".into() }
        );
    }

    #[test]
    fn test_value_out_of_range() {
        assert_eq!(
            assemble("LDI R0,256").unwrap_err(),
            AssemblerError::ValueOutOfRange { line: 1, value: 256 }
        );
        assert!(matches!(
            assemble("LDI R0,-1"),
            Err(AssemblerError::ValueOutOfRange { value: -1, .. })
        ));
    }

    #[test]
    fn test_undefined_label() {
        assert!(matches!(
            assemble("LDI R0,NOWHERE"),
            Err(AssemblerError::UndefinedLabel { line: 1, .. })
        ));
    }

    #[test]
    fn test_duplicate_label() {
        assert!(matches!(
            assemble("A: HLT\nA: HLT"),
            Err(AssemblerError::SyntaxError { line: 2, .. })
        ));
    }
}
