//! CPU emulation for the LS-8.
//!
//! This module implements the complete LS-8 architecture:
//! - 256 bytes of memory
//! - 8 byte-wide registers, R7 serving as the stack pointer
//! - an FL register written by CMP
//! - a 13-instruction set with 0, 1 or 2 operand bytes

pub mod memory;
pub mod registers;
pub mod flags;
pub mod alu;
pub mod decode;
pub mod execute;

pub use memory::{Memory, MemoryError};
pub use registers::{Registers, RegisterError};
pub use flags::Flags;
pub use alu::{AluOp, AluError};
pub use decode::{Instruction, Opcode, OpcodeInfo, DecodeError};
pub use execute::{Cpu, CpuError, CpuSnapshot, CpuState};
