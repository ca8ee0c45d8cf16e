//! Program loading, assembly and disassembly for the LS-8.
//!
//! This module provides:
//! - The `.ls8` loader (binary text → bytes)
//! - A two-pass assembler (mnemonics → bytes)
//! - A disassembler (bytes → readable text)

pub mod assembler;
pub mod disasm;
pub mod program;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use program::{Program, LoadError, load_program, parse_program, save_program};
