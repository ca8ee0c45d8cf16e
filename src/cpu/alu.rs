//! Arithmetic-logic unit.
//!
//! Stateless: operates on two register indices, writing the result back to
//! the first register (ADD, MUL) or to FL (CMP). Arithmetic wraps modulo 256.

use crate::cpu::decode::Opcode;
use crate::cpu::flags::Flags;
use crate::cpu::registers::{Registers, RegisterError};
use thiserror::Error;

/// Operations the ALU implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Mul,
    Cmp,
}

impl TryFrom<Opcode> for AluOp {
    type Error = AluError;

    fn try_from(op: Opcode) -> Result<Self, Self::Error> {
        match op {
            Opcode::Add => Ok(AluOp::Add),
            Opcode::Mul => Ok(AluOp::Mul),
            Opcode::Cmp => Ok(AluOp::Cmp),
            other => Err(AluError::UnsupportedOperation(other)),
        }
    }
}

/// Apply `op` to registers `a` and `b`.
pub fn apply(
    op: AluOp,
    a: u8,
    b: u8,
    regs: &mut Registers,
    flags: &mut Flags,
) -> Result<(), AluError> {
    let lhs = regs.get(a)?;
    let rhs = regs.get(b)?;

    match op {
        AluOp::Add => regs.set(a, lhs.wrapping_add(rhs))?,
        AluOp::Mul => regs.set(a, lhs.wrapping_mul(rhs))?,
        AluOp::Cmp => flags.set_from(lhs.cmp(&rhs)),
    }

    Ok(())
}

/// Errors raised by the ALU.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AluError {
    /// The opcode has no ALU implementation. The dispatch table only routes
    /// ALU opcodes here, so this indicates an internal inconsistency.
    #[error("unsupported ALU operation: {}", .0.mnemonic())]
    UnsupportedOperation(Opcode),

    #[error(transparent)]
    Register(#[from] RegisterError),
}
