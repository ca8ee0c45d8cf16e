//! LS-8 CPU registers.
//!
//! The LS-8 has 8 general-purpose byte registers, R0-R7. R7 doubles as
//! the stack pointer (SP). Nothing stops a program from writing R7 with
//! LDI or POP; doing so relocates the stack, and any return addresses or
//! data pushed before that point are lost to RET and POP.

use serde::Serialize;
use thiserror::Error;

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// Index of the register used as the stack pointer.
pub const SP: u8 = 7;

/// Initial stack pointer: the top of the stack when the stack is empty.
pub const SP_INIT: u8 = 0xF4;

/// The LS-8 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Registers {
    values: [u8; REGISTER_COUNT],
}

impl Registers {
    /// Create a register file with R0-R6 zeroed and SP seeded with `SP_INIT`.
    pub fn new() -> Self {
        Self::with_stack_pointer(SP_INIT)
    }

    /// Create a register file with a custom stack pointer seed.
    pub fn with_stack_pointer(sp: u8) -> Self {
        let mut values = [0; REGISTER_COUNT];
        values[SP as usize] = sp;
        Self { values }
    }

    /// Reset all registers, re-seeding the stack pointer.
    pub fn reset(&mut self, sp: u8) {
        *self = Self::with_stack_pointer(sp);
    }

    /// Read register `index`.
    #[inline]
    pub fn get(&self, index: u8) -> Result<u8, RegisterError> {
        self.values
            .get(index as usize)
            .copied()
            .ok_or(RegisterError::InvalidRegister(index))
    }

    /// Write register `index`.
    ///
    /// Values are bytes, so every arithmetic result stored here has already
    /// been reduced modulo 256.
    #[inline]
    pub fn set(&mut self, index: u8, value: u8) -> Result<(), RegisterError> {
        let slot = self.values
            .get_mut(index as usize)
            .ok_or(RegisterError::InvalidRegister(index))?;
        *slot = value;
        Ok(())
    }

    /// Current stack pointer.
    #[inline]
    pub fn sp(&self) -> u8 {
        self.values[SP as usize]
    }

    /// Overwrite the stack pointer.
    #[inline]
    pub fn set_sp(&mut self, value: u8) {
        self.values[SP as usize] = value;
    }

    /// All register values, R0 first.
    pub fn values(&self) -> &[u8; REGISTER_COUNT] {
        &self.values
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors raised by register access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid register R{0} (valid: R0-R7)")]
    InvalidRegister(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_seeds_stack_pointer() {
        let regs = Registers::new();
        assert_eq!(regs.sp(), 0xF4);
        for r in 0..7 {
            assert_eq!(regs.get(r).unwrap(), 0);
        }
    }

    #[test]
    fn test_get_set() {
        let mut regs = Registers::new();
        regs.set(3, 200).unwrap();
        assert_eq!(regs.get(3).unwrap(), 200);
    }

    #[test]
    fn test_invalid_register() {
        let mut regs = Registers::new();
        assert_eq!(regs.get(8), Err(RegisterError::InvalidRegister(8)));
        assert_eq!(regs.set(255, 1), Err(RegisterError::InvalidRegister(255)));
    }

    #[test]
    fn test_r7_is_stack_pointer() {
        let mut regs = Registers::new();
        regs.set(SP, 0x80).unwrap();
        assert_eq!(regs.sp(), 0x80);

        regs.set_sp(0x10);
        assert_eq!(regs.get(7).unwrap(), 0x10);
    }

    #[test]
    fn test_reset() {
        let mut regs = Registers::new();
        regs.set(0, 5).unwrap();
        regs.reset(0xFF);
        assert_eq!(regs.get(0).unwrap(), 0);
        assert_eq!(regs.sp(), 0xFF);
    }
}
