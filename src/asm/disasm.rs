//! Disassembler for F4F programs.
//!
//! Converts instruction words back to text the assembler accepts.

use crate::cpu::decode::{decode, Instruction};

/// Disassemble a single instruction word to text.
pub fn disassemble_instruction(word: u16) -> String {
    match decode(word) {
        Ok(decoded) => format_instruction(&decoded),
        Err(_) => format!(".word {:#06x}", word),
    }
}

/// Disassemble a sequence of words placed at `origin`.
pub fn disassemble(words: &[u16], origin: u16) -> String {
    let mut output = String::new();
    output.push_str("; F4F Disassembly\n");
    output.push_str("; ---------------\n\n");

    for (i, word) in words.iter().enumerate() {
        let addr = origin as usize + i * 2;
        let line = disassemble_instruction(*word);
        output.push_str(&format!("{:04X}: {:04X}  {}\n", addr, word, line));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    let mnemonic = instr.opcode().mnemonic();
    match *instr {
        Instruction::Halt => mnemonic.to_string(),

        Instruction::LoadWord { dest: reg, base, offset }
        | Instruction::StoreWord { src: reg, base, offset } => {
            format!("{} r{}, r{}, {}", mnemonic, reg, base, offset)
        }

        Instruction::LoadUpperImmediate { dest, imm } | Instruction::AddImmediate { dest, imm } => {
            format!("{} r{}, {:#04x}", mnemonic, dest, imm)
        }

        Instruction::Add { dest: a, src1, src2 }
        | Instruction::Sub { dest: a, src1, src2 }
        | Instruction::BranchEqual { offset: a, src1, src2 }
        | Instruction::BranchNotEqual { offset: a, src1, src2 } => {
            format!("{} r{}, r{}, r{}", mnemonic, a, src1, src2)
        }

        Instruction::JumpAbsolute { target: reg } | Instruction::JumpRelative { offset: reg } => {
            format!("{} r{}", mnemonic, reg)
        }
    }
}
