//! Machine faults.
//!
//! Every fault is terminal for the current run: the engine moves to
//! `Faulted` and reports the fault together with the faulting PC.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// A fault raised while executing an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Fault {
    /// No handler for the opcode, or an operand names a register that
    /// does not exist on this machine.
    #[error("illegal instruction: {0}")]
    IllegalInstruction(IllegalReason),

    /// A memory or control-transfer address outside 0..=0xFFFF.
    #[error("address {addr} out of bound (0..=65535)")]
    OutOfBound { addr: i64 },

    /// A word access (fetch, load/store, control transfer) at an odd address.
    #[error("misaligned word access at {addr:#06x}")]
    Misaligned { addr: i64 },
}

/// Why an instruction was rejected as illegal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum IllegalReason {
    #[error("no handler for opcode {0:#04x}")]
    Opcode(u8),

    #[error("register index {0} out of range")]
    Register(u8),
}

impl Fault {
    /// Short name of the fault class.
    pub fn kind(&self) -> &'static str {
        match self {
            Fault::IllegalInstruction(_) => "IllegalInstruction",
            Fault::OutOfBound { .. } => "OutOfBound",
            Fault::Misaligned { .. } => "Misaligned",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display() {
        let f = Fault::IllegalInstruction(IllegalReason::Opcode(0x07));
        assert_eq!(f.to_string(), "illegal instruction: no handler for opcode 0x07");

        let f = Fault::Misaligned { addr: 0x13 };
        assert_eq!(f.to_string(), "misaligned word access at 0x0013");
    }

    #[test]
    fn test_fault_kind() {
        assert_eq!(Fault::OutOfBound { addr: 0x10000 }.kind(), "OutOfBound");
        assert_eq!(
            Fault::IllegalInstruction(IllegalReason::Register(7)).kind(),
            "IllegalInstruction"
        );
    }
}
