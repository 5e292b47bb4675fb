//! CPU emulation for the F4F.
//!
//! This module implements the complete F4F architecture:
//! - 64 KiB flat, byte-addressable memory with checked word access
//! - up to 8 general-purpose registers, a program counter and a status register
//! - an 11-instruction set with a 5-bit opcode field

pub mod fault;
pub mod memory;
pub mod registers;
pub mod alu;
pub mod decode;
pub mod execute;

pub use fault::{Fault, IllegalReason};
pub use memory::Memory;
pub use registers::{Flags, Registers};
pub use decode::{Instruction, Opcode, Operand};
pub use execute::{Cpu, CpuError, CpuState, FaultRecord, Snapshot};
