//! `.ls8` program files.
//!
//! The format is plain text:
//! - One byte per line, written as exactly 8 binary digits (`10000010`)
//! - Everything after `#` is a comment
//! - Blank and comment-only lines are ignored
//!
//! Bytes are placed in memory in file order starting at address 0.

use std::path::Path;
use thiserror::Error;
use crate::asm::disasm::disassemble_instruction;
use crate::cpu::memory::MEMORY_SIZE;

/// A loaded program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Program bytes, address 0 first.
    pub bytes: Vec<u8>,
    /// Original source lines (for debugging).
    pub source_lines: Vec<String>,
}

impl Program {
    /// Create a new empty program.
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            source_lines: Vec::new(),
        }
    }

    /// Build a program from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let source_lines = bytes.iter().map(|b| format!("{:08b}", b)).collect();
        Self { bytes, source_lines }
    }

    /// Append a byte.
    pub fn push(&mut self, byte: u8, source: &str) {
        self.bytes.push(byte);
        self.source_lines.push(source.to_string());
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Render the program in `.ls8` form, annotating each instruction with
    /// its address and disassembly.
    pub fn to_ls8(&self) -> String {
        let mut text = format!("# LS-8 program, {} bytes\n\n", self.len());

        let mut addr = 0;
        while addr < self.bytes.len() {
            let (asm, len) = disassemble_instruction(&self.bytes[addr..]);
            text.push_str(&format!("{:08b} # {:02X}: {}\n", self.bytes[addr], addr, asm));
            for operand in self.bytes.iter().skip(addr + 1).take(len - 1) {
                text.push_str(&format!("{:08b}\n", operand));
            }
            addr += len;
        }

        text
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `.ls8` source text.
pub fn parse_program(source: &str) -> Result<Program, LoadError> {
    let mut program = Program::new();

    for (line_num, line) in source.lines().enumerate() {
        let command = line.split('#').next().unwrap_or_default().trim();
        if command.is_empty() {
            continue;
        }

        if command.len() != 8 || !command.bytes().all(|c| c == b'0' || c == b'1') {
            return Err(LoadError::Parse {
                line: line_num + 1,
                message: format!("expected 8 binary digits, found {:?}", command),
            });
        }

        let byte = u8::from_str_radix(command, 2).map_err(|e| LoadError::Parse {
            line: line_num + 1,
            message: format!("{:?} is not a byte: {}", command, e),
        })?;

        program.push(byte, line.trim());
    }

    if program.is_empty() {
        return Err(LoadError::Empty);
    }
    if program.len() > MEMORY_SIZE {
        return Err(LoadError::TooLarge { size: program.len() });
    }

    Ok(program)
}

/// Load a `.ls8` file from disk.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Program, LoadError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .map_err(|e| LoadError::Io(format!("{}: {}", path.display(), e)))?;

    let program = parse_program(&source)?;
    tracing::debug!(path = %path.display(), bytes = program.len(), "parsed program");
    Ok(program)
}

/// Save a program to disk in `.ls8` form.
pub fn save_program<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), LoadError> {
    let path = path.as_ref();
    std::fs::write(path, program.to_ls8())
        .map_err(|e| LoadError::Io(format!("{}: {}", path.display(), e)))
}

/// Errors that can occur loading a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("program was empty")]
    Empty,

    #[error("program is {size} bytes, memory holds {}", MEMORY_SIZE)]
    TooLarge { size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRINT8: &str = "\
# print8.ls8

10000010 # LDI R0,8
00000000
00001000
01000111 # PRN R0
00000000
00000001 # HLT
";

    #[test]
    fn test_parse_print8() {
        let program = parse_program(PRINT8).unwrap();
        assert_eq!(program.bytes, vec![0b1000_0010, 0, 8, 0b0100_0111, 0, 1]);
        assert_eq!(program.source_lines[0], "10000010 # LDI R0,8");
    }

    #[test]
    fn test_whitespace_and_comment_only_lines() {
        let program = parse_program("   \n  # nothing\n\t00000001   # HLT \n\n").unwrap();
        assert_eq!(program.bytes, vec![1]);
    }

    #[test]
    fn test_malformed_line() {
        let err = parse_program("00000001\n1000201\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_rejects_sign_and_oversized_values() {
        assert!(matches!(parse_program("+1"), Err(LoadError::Parse { line: 1, .. })));
        assert!(matches!(parse_program("100000000"), Err(LoadError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_rejects_lines_that_are_not_eight_digits() {
        assert!(matches!(
            parse_program("00000001\n0000000001\n"),
            Err(LoadError::Parse { line: 2, .. })
        ));
        assert!(matches!(parse_program("1"), Err(LoadError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(parse_program("# only comments\n\n"), Err(LoadError::Empty));
    }

    #[test]
    fn test_program_too_large() {
        let source = "00000000\n".repeat(MEMORY_SIZE + 1);
        assert_eq!(parse_program(&source), Err(LoadError::TooLarge { size: 257 }));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_program("/nonexistent/program.ls8"),
            Err(LoadError::Io(_))
        ));
    }

    #[test]
    fn test_to_ls8_annotates_instructions() {
        let program = parse_program(PRINT8).unwrap();
        let text = program.to_ls8();

        assert!(text.contains("10000010 # 00: LDI R0,8\n00000000\n00001000\n"));
        assert!(text.contains("00000001 # 05: HLT\n"));
        assert_eq!(parse_program(&text).unwrap().bytes, program.bytes);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("ls8-save-{}.ls8", std::process::id()));
        let program = Program::from_bytes(vec![0b1000_0010, 1, 200, 0b0000_0001]);

        save_program(&path, &program).unwrap();
        let loaded = load_program(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.bytes, program.bytes);
    }
}
