//! Instruction decoder for the F4F.
//!
//! Every instruction is one 16-bit word:
//!
//! ```text
//!  15    11 10   8 7    5 4    2 1  0
//! +--------+------+------+------+----+
//! | opcode | dest | src1 | src2 |    |
//! +--------+------+------+------+----+
//!                 |   imm8 (lui/addi)|
//!                 | base |  offset5  |  (lw/sw)
//! ```
//!
//! Each family reads only the fields it needs; the remaining bits are ignored.

use crate::cpu::fault::{Fault, IllegalReason};
use serde::{Serialize, Deserialize};

/// Width of the opcode field.
pub const OPCODE_BITS: u32 = 5;

/// Number of dispatch slots (2^OPCODE_BITS).
pub const OPCODE_SLOTS: usize = 1 << OPCODE_BITS;

const OPCODE_SHIFT: u32 = 16 - OPCODE_BITS;
const OPERAND_MASK: u16 = (1 << OPCODE_SHIFT) - 1;

/// Opcode values. Halt takes the last table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    LoadWord = 0x01,
    StoreWord = 0x02,
    LoadUpperImmediate = 0x03,
    AddImmediate = 0x04,
    Add = 0x05,
    Sub = 0x06,
    JumpAbsolute = 0x11,
    JumpRelative = 0x12,
    BranchEqual = 0x13,
    BranchNotEqual = 0x14,
    Halt = 0x1F,
}

impl Opcode {
    /// Every opcode with a handler.
    pub const ALL: [Opcode; 11] = [
        Opcode::LoadWord,
        Opcode::StoreWord,
        Opcode::LoadUpperImmediate,
        Opcode::AddImmediate,
        Opcode::Add,
        Opcode::Sub,
        Opcode::JumpAbsolute,
        Opcode::JumpRelative,
        Opcode::BranchEqual,
        Opcode::BranchNotEqual,
        Opcode::Halt,
    ];

    /// Look up the handler slot for a raw opcode field.
    pub fn from_bits(bits: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| *op as u8 == bits)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::LoadWord => "lw",
            Opcode::StoreWord => "sw",
            Opcode::LoadUpperImmediate => "lui",
            Opcode::AddImmediate => "addi",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::JumpAbsolute => "ja",
            Opcode::JumpRelative => "jr",
            Opcode::BranchEqual => "beq",
            Opcode::BranchNotEqual => "bne",
            Opcode::Halt => "halt",
        }
    }

    /// Inverse of [`Opcode::mnemonic`], case-insensitive.
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(text))
    }
}

/// The operand field of an instruction word (its low 11 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand(u16);

impl Operand {
    pub fn new(bits: u16) -> Self {
        Self(bits & OPERAND_MASK)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    /// Bits 10..8.
    pub fn dest(self) -> u8 {
        ((self.0 >> 8) & 0x7) as u8
    }

    /// Bits 7..5.
    pub fn src1(self) -> u8 {
        ((self.0 >> 5) & 0x7) as u8
    }

    /// Bits 4..2.
    pub fn src2(self) -> u8 {
        ((self.0 >> 2) & 0x7) as u8
    }

    /// Bits 4..0, unsigned.
    pub fn offset(self) -> u8 {
        (self.0 & 0x1F) as u8
    }

    /// Bits 7..0.
    pub fn imm8(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

/// Decoded F4F instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Stop the machine.
    Halt,

    /// dest := word at (base + offset)
    LoadWord { dest: u8, base: u8, offset: u8 },

    /// word at (base + offset) := src
    StoreWord { src: u8, base: u8, offset: u8 },

    /// dest := imm << 8
    LoadUpperImmediate { dest: u8, imm: u8 },

    /// dest := dest + imm (mod 2^16), flags untouched
    AddImmediate { dest: u8, imm: u8 },

    /// dest := src1 + src2, sets flags
    Add { dest: u8, src1: u8, src2: u8 },

    /// dest := src1 - src2, sets flags
    Sub { dest: u8, src1: u8, src2: u8 },

    /// PC := target
    JumpAbsolute { target: u8 },

    /// PC := PC + offset (signed)
    JumpRelative { offset: u8 },

    /// if src1 == src2 then PC := PC + offset (unsigned)
    BranchEqual { offset: u8, src1: u8, src2: u8 },

    /// if src1 != src2 then PC := PC + offset (unsigned)
    BranchNotEqual { offset: u8, src1: u8, src2: u8 },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Halt => Opcode::Halt,
            Instruction::LoadWord { .. } => Opcode::LoadWord,
            Instruction::StoreWord { .. } => Opcode::StoreWord,
            Instruction::LoadUpperImmediate { .. } => Opcode::LoadUpperImmediate,
            Instruction::AddImmediate { .. } => Opcode::AddImmediate,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Sub { .. } => Opcode::Sub,
            Instruction::JumpAbsolute { .. } => Opcode::JumpAbsolute,
            Instruction::JumpRelative { .. } => Opcode::JumpRelative,
            Instruction::BranchEqual { .. } => Opcode::BranchEqual,
            Instruction::BranchNotEqual { .. } => Opcode::BranchNotEqual,
        }
    }
}

/// Split a word into its raw opcode and operand fields.
#[inline]
pub fn split(word: u16) -> (u8, Operand) {
    ((word >> OPCODE_SHIFT) as u8, Operand::new(word))
}

/// Build the instruction for an opcode slot. Empty slots are illegal.
pub fn dispatch(opcode: u8, operand: Operand) -> Result<Instruction, Fault> {
    let op = Opcode::from_bits(opcode)
        .ok_or(Fault::IllegalInstruction(IllegalReason::Opcode(opcode)))?;

    let instruction = match op {
        Opcode::Halt => Instruction::Halt,
        Opcode::LoadWord => Instruction::LoadWord {
            dest: operand.dest(),
            base: operand.src1(),
            offset: operand.offset(),
        },
        Opcode::StoreWord => Instruction::StoreWord {
            src: operand.dest(),
            base: operand.src1(),
            offset: operand.offset(),
        },
        Opcode::LoadUpperImmediate => Instruction::LoadUpperImmediate {
            dest: operand.dest(),
            imm: operand.imm8(),
        },
        Opcode::AddImmediate => Instruction::AddImmediate {
            dest: operand.dest(),
            imm: operand.imm8(),
        },
        Opcode::Add => Instruction::Add {
            dest: operand.dest(),
            src1: operand.src1(),
            src2: operand.src2(),
        },
        Opcode::Sub => Instruction::Sub {
            dest: operand.dest(),
            src1: operand.src1(),
            src2: operand.src2(),
        },
        Opcode::JumpAbsolute => Instruction::JumpAbsolute { target: operand.dest() },
        Opcode::JumpRelative => Instruction::JumpRelative { offset: operand.dest() },
        Opcode::BranchEqual => Instruction::BranchEqual {
            offset: operand.dest(),
            src1: operand.src1(),
            src2: operand.src2(),
        },
        Opcode::BranchNotEqual => Instruction::BranchNotEqual {
            offset: operand.dest(),
            src1: operand.src1(),
            src2: operand.src2(),
        },
    };

    Ok(instruction)
}

/// Decode an instruction word.
pub fn decode(word: u16) -> Result<Instruction, Fault> {
    let (opcode, operand) = split(word);
    dispatch(opcode, operand)
}

/// Encode an instruction back to a word.
///
/// Register fields are masked to 3 bits, offsets to 5 bits.
pub fn encode(instr: &Instruction) -> u16 {
    let reg = |r: u8, shift: u32| ((r as u16) & 0x7) << shift;
    let operand = match *instr {
        Instruction::Halt => 0,
        Instruction::LoadWord { dest, base, offset } => {
            reg(dest, 8) | reg(base, 5) | (offset as u16 & 0x1F)
        }
        Instruction::StoreWord { src, base, offset } => {
            reg(src, 8) | reg(base, 5) | (offset as u16 & 0x1F)
        }
        Instruction::LoadUpperImmediate { dest, imm } | Instruction::AddImmediate { dest, imm } => {
            reg(dest, 8) | imm as u16
        }
        Instruction::Add { dest, src1, src2 } | Instruction::Sub { dest, src1, src2 } => {
            reg(dest, 8) | reg(src1, 5) | reg(src2, 2)
        }
        Instruction::JumpAbsolute { target } => reg(target, 8),
        Instruction::JumpRelative { offset } => reg(offset, 8),
        Instruction::BranchEqual { offset, src1, src2 }
        | Instruction::BranchNotEqual { offset, src1, src2 } => {
            reg(offset, 8) | reg(src1, 5) | reg(src2, 2)
        }
    };

    ((instr.opcode() as u16) << OPCODE_SHIFT) | operand
}
