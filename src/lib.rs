//! # LS-8 Emulator
//!
//! An emulator for the LS-8, a small 8-bit computer used for teaching
//! how CPUs work: 256 bytes of RAM, eight byte registers, a flags
//! register, and a thirteen-instruction set with a memory-backed stack.

pub mod cpu;
pub mod asm;
pub mod config;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, CpuSnapshot, Memory, Registers, Flags, Instruction, Opcode};
pub use asm::{assemble, disassemble, AssemblerError, Program, LoadError, load_program, parse_program, save_program};
pub use config::{MachineConfig, ConfigError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
