//! CPU execution engine for the LS-8.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use std::io::Write;
use crate::config::MachineConfig;
use crate::cpu::{Flags, Memory, Registers};
use crate::cpu::alu::{self, AluError, AluOp};
use crate::cpu::decode::{self, DecodeError, Instruction, Opcode};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::{RegisterError, REGISTER_COUNT, SP_INIT};
use serde::Serialize;
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HLT instruction).
    Halted,
    /// CPU stopped on an execution error.
    Error,
}

/// The LS-8 CPU.
///
/// Owns all machine state; instruction handlers borrow it mutably for the
/// duration of one step.
#[derive(Clone)]
pub struct Cpu {
    /// General-purpose registers, R7 being the stack pointer.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// FL register.
    pub flags: Flags,
    /// Program counter.
    pub pc: usize,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    /// Value R7 is seeded with on construction and reset.
    stack_seed: u8,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU with zeroed memory and the default stack pointer.
    pub fn new() -> Self {
        Self::with_stack_pointer(SP_INIT)
    }

    /// Create a new CPU from a machine config.
    pub fn with_config(config: &MachineConfig) -> Self {
        Self::with_stack_pointer(config.stack_pointer)
    }

    fn with_stack_pointer(sp: u8) -> Self {
        Self {
            regs: Registers::with_stack_pointer(sp),
            mem: Memory::new(),
            flags: Flags::new(),
            pc: 0,
            state: CpuState::Running,
            cycles: 0,
            stack_seed: sp,
            last_instr: None,
        }
    }

    /// Reset the CPU to its power-on state. Memory is cleared.
    pub fn reset(&mut self) {
        self.regs.reset(self.stack_seed);
        self.mem.clear();
        self.flags.clear();
        self.pc = 0;
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
        tracing::debug!(sp = self.stack_seed, "cpu reset");
    }

    /// Load a program into memory at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(0, program)?;
        tracing::debug!(bytes = program.len(), "program loaded");
        Ok(())
    }

    /// Execute a single instruction, writing any PRN output to `out`.
    ///
    /// Returns the instruction that was executed, or an error. An error
    /// leaves the CPU in [`CpuState::Error`] with the PC still pointing at
    /// the faulting instruction.
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!("{}", self.trace_line());
        }

        let pc = self.pc;
        match self.fetch().and_then(|instr| self.execute(instr, out).map(|()| instr)) {
            Ok(instr) => {
                self.cycles += 1;
                self.last_instr = Some(instr);
                if self.state == CpuState::Halted {
                    tracing::info!(pc, cycles = self.cycles, "cpu halted");
                }
                Ok(instr)
            }
            Err(e) => {
                self.state = CpuState::Error;
                tracing::debug!(pc, error = %e, "execution failed");
                Err(e)
            }
        }
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited<W: Write>(&mut self, out: &mut W, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == CpuState::Running && self.cycles < limit {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Read the instruction at the PC along with its operand bytes.
    fn fetch(&self) -> Result<Instruction, CpuError> {
        let pc = self.pc;
        let opcode = self.mem.read(pc)?;
        let op = Opcode::try_from(opcode)
            .map_err(|_| CpuError::IllegalInstruction { opcode, pc })?;

        let mut operands = [0u8; 2];
        for (i, slot) in operands.iter_mut().take(op.operand_count()).enumerate() {
            *slot = self.mem.read(pc + 1 + i)?;
        }

        Ok(decode::decode(opcode, &operands)?)
    }

    /// Execute a decoded instruction.
    ///
    /// Instructions whose opcode has the sets-PC bit own the PC for this
    /// step; for everything else the PC advances past the instruction.
    fn execute<W: Write>(&mut self, instr: Instruction, out: &mut W) -> Result<(), CpuError> {
        match instr {
            // ==================== Control ====================

            Instruction::Hlt => {
                self.state = CpuState::Halted;
            }

            Instruction::Call { reg } => {
                let target = self.regs.get(reg)?;
                let return_addr = self.pc + 2;
                let return_byte = u8::try_from(return_addr)
                    .map_err(|_| CpuError::ReturnAddressOutOfRange(return_addr))?;
                self.push(return_byte)?;
                self.pc = target as usize;
            }

            Instruction::Ret => {
                self.pc = self.pop()? as usize;
            }

            Instruction::Jmp { reg } => {
                self.pc = self.regs.get(reg)? as usize;
            }

            Instruction::Jeq { reg } => {
                let target = self.regs.get(reg)?;
                self.branch_if(self.flags.is_equal(), target);
            }

            Instruction::Jne { reg } => {
                let target = self.regs.get(reg)?;
                self.branch_if(!self.flags.is_equal(), target);
            }

            // ==================== Data ====================

            Instruction::Ldi { reg, imm } => {
                self.regs.set(reg, imm)?;
            }

            Instruction::Prn { reg } => {
                let value = self.regs.get(reg)?;
                writeln!(out, "{}", value).map_err(|e| CpuError::Output(e.to_string()))?;
            }

            Instruction::Push { reg } => {
                self.regs.get(reg)?;
                let sp = self.regs.sp().wrapping_sub(1);
                self.regs.set_sp(sp);
                // Read after the decrement: PUSH R7 stores the new SP.
                let value = self.regs.get(reg)?;
                self.mem.write(sp as usize, value)?;
            }

            Instruction::Pop { reg } => {
                self.regs.get(reg)?;
                let sp = self.regs.sp();
                let value = self.mem.read(sp as usize)?;
                self.mem.write(sp as usize, 0)?;
                self.regs.set(reg, value)?;
                // Increment after the write: POP R7 leaves the popped value + 1.
                self.regs.set_sp(self.regs.sp().wrapping_add(1));
            }

            // ==================== ALU ====================

            Instruction::Add { a, b }
            | Instruction::Mul { a, b }
            | Instruction::Cmp { a, b } => {
                let op = AluOp::try_from(instr.opcode())?;
                alu::apply(op, a, b, &mut self.regs, &mut self.flags)?;
            }
        }

        if !instr.opcode().info().sets_pc {
            self.pc += instr.len();
        }

        Ok(())
    }

    /// Take a conditional branch, or step over the 2-byte jump instruction.
    fn branch_if(&mut self, taken: bool, target: u8) {
        if taken {
            self.pc = target as usize;
        } else {
            self.pc += 2;
        }
    }

    /// Push a byte: decrement SP, then write.
    fn push(&mut self, value: u8) -> Result<(), CpuError> {
        let sp = self.regs.sp().wrapping_sub(1);
        self.regs.set_sp(sp);
        self.mem.write(sp as usize, value)?;
        Ok(())
    }

    /// Pop a byte: read, clear the slot, then increment SP.
    fn pop(&mut self) -> Result<u8, CpuError> {
        let sp = self.regs.sp();
        let value = self.mem.read(sp as usize)?;
        self.mem.write(sp as usize, 0)?;
        self.regs.set_sp(sp.wrapping_add(1));
        Ok(value)
    }

    /// One-line dump of the PC, the next three bytes and all registers.
    ///
    /// `TRACE: 00 | 82 00 08 | 00 00 00 00 00 00 00 F4`
    pub fn trace_line(&self) -> String {
        let byte_at = |addr: usize| {
            self.mem
                .read(addr)
                .map_or_else(|_| "--".to_string(), |b| format!("{:02X}", b))
        };

        let mut line = format!(
            "TRACE: {:02X} | {} {} {} |",
            self.pc,
            byte_at(self.pc),
            byte_at(self.pc + 1),
            byte_at(self.pc + 2),
        );
        for value in self.regs.values() {
            line.push_str(&format!(" {:02X}", value));
        }
        line
    }

    /// Serializable view of the machine, for diagnostics.
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            pc: self.pc,
            registers: *self.regs.values(),
            flags: self.flags.bits(),
            state: self.state,
            cycles: self.cycles,
            memory: self.mem
                .dump(0, crate::cpu::memory::MEMORY_SIZE)
                .into_iter()
                .filter(|&(_, value)| value != 0)
                .collect(),
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("flags", &self.flags)
            .finish()
    }
}

/// Point-in-time copy of the CPU state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuSnapshot {
    pub pc: usize,
    pub registers: [u8; REGISTER_COUNT],
    pub flags: u8,
    pub state: CpuState,
    pub cycles: u64,
    /// Non-zero memory cells as `(address, value)`.
    pub memory: Vec<(usize, u8)>,
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("illegal instruction {opcode:#010b} at address {pc:#04x}")]
    IllegalInstruction { opcode: u8, pc: usize },

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("register error: {0}")]
    Register(#[from] RegisterError),

    #[error("ALU error: {0}")]
    Alu(#[from] AluError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("return address {0:#x} does not fit in a byte")]
    ReturnAddressOutOfRange(usize),

    #[error("output error: {0}")]
    Output(String),
}
