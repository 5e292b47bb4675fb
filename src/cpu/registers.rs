//! F4F CPU registers.
//!
//! The register file holds:
//! - R0..R(n-1): 16-bit general-purpose registers (n is a machine parameter, at most 8)
//! - PC: 16-bit program counter
//! - SR: status register with the Zero, Carry, Overflow and Sign flags

use crate::cpu::fault::{Fault, IllegalReason};
use serde::{Serialize, Deserialize};

/// Largest register count addressable by the 3-bit register fields.
pub const MAX_REGISTERS: usize = 8;

/// Register count used when none is configured.
pub const DEFAULT_REGISTERS: usize = 6;

/// The status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags {
    pub zero: bool,
    pub carry: bool,
    pub overflow: bool,
    pub sign: bool,
}

impl Flags {
    pub const ZERO: u8 = 0b0001;
    pub const CARRY: u8 = 0b0010;
    pub const OVERFLOW: u8 = 0b0100;
    pub const SIGN: u8 = 0b1000;

    /// Pack into the 4-bit status register layout.
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.zero {
            bits |= Self::ZERO;
        }
        if self.carry {
            bits |= Self::CARRY;
        }
        if self.overflow {
            bits |= Self::OVERFLOW;
        }
        if self.sign {
            bits |= Self::SIGN;
        }
        bits
    }

    /// Unpack from the status register layout. Bits above the low four are ignored.
    pub fn from_bits(bits: u8) -> Self {
        Self {
            zero: bits & Self::ZERO != 0,
            carry: bits & Self::CARRY != 0,
            overflow: bits & Self::OVERFLOW != 0,
            sign: bits & Self::SIGN != 0,
        }
    }
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}{}",
            flag(self.sign, 'S'),
            flag(self.overflow, 'V'),
            flag(self.carry, 'C'),
            flag(self.zero, 'Z'),
        )
    }
}

/// The F4F register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// General-purpose registers.
    gpr: Vec<u16>,

    /// Program counter.
    pc: u16,

    /// Status register.
    flags: Flags,
}

impl Registers {
    /// Create a register file with `count` general-purpose registers, all zeroed.
    ///
    /// `count` is clamped to `1..=MAX_REGISTERS`; configuration is
    /// validated before it gets here.
    pub fn new(count: usize) -> Self {
        Self {
            gpr: vec![0; count.clamp(1, MAX_REGISTERS)],
            pc: 0,
            flags: Flags::default(),
        }
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        self.gpr.fill(0);
        self.pc = 0;
        self.flags = Flags::default();
    }

    /// Number of general-purpose registers.
    pub fn count(&self) -> usize {
        self.gpr.len()
    }

    /// Check that `index` names an existing register.
    #[inline]
    pub fn check(&self, index: u8) -> Result<usize, Fault> {
        let i = index as usize;
        if i < self.gpr.len() {
            Ok(i)
        } else {
            Err(Fault::IllegalInstruction(IllegalReason::Register(index)))
        }
    }

    /// Read a general-purpose register.
    #[inline]
    pub fn get(&self, index: u8) -> Result<u16, Fault> {
        let i = self.check(index)?;
        Ok(self.gpr[i])
    }

    /// Write a general-purpose register.
    #[inline]
    pub fn set(&mut self, index: u8, value: u16) -> Result<(), Fault> {
        let i = self.check(index)?;
        self.gpr[i] = value;
        Ok(())
    }

    /// All general-purpose registers, in index order.
    pub fn gprs(&self) -> &[u16] {
        &self.gpr
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    /// Advance the program counter past one instruction word.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(2);
        old
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Replace the whole status register at once.
    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTERS)
    }
}
