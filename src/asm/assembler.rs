//! Simple assembler for F4F programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! start:                  ; Define a label
//!     lui  r1, hi(data)   ; r1 := high byte of `data` << 8
//!     addi r1, lo(data)   ; r1 += low byte of `data`
//!     lw   r2, r1, 0      ; r2 := word at r1 + 0
//!     add  r3, r2, r2
//!     beq  r4, r1, r2     ; if r1 == r2 then PC += r4
//!     halt
//! data:
//!     .word 0x1234        ; Define a data word
//! ```
//!
//! Labels resolve to absolute addresses relative to the assembly origin.

use crate::config::DEFAULT_LOAD_ADDRESS;
use crate::cpu::decode::{encode, Instruction, Opcode};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code at the default load address.
pub fn assemble(source: &str) -> Result<Vec<u16>, AssemblerError> {
    assemble_at(source, DEFAULT_LOAD_ADDRESS)
}

/// Assemble source code for a program that will be loaded at `origin`.
pub fn assemble_at(source: &str, origin: u16) -> Result<Vec<u16>, AssemblerError> {
    let mut asm = Assembler::new(origin);
    asm.assemble(source)
}

/// Which part of a label's address an operand refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    /// The whole 16-bit address (`.word label`).
    Full,
    /// Bits 15..8 (`hi(label)`).
    High,
    /// Bits 7..0 (`lo(label)`).
    Low,
}

/// A value that may still need a label resolved.
enum Value {
    Known(i64),
    Label(String, Part),
}

/// The assembler state.
struct Assembler {
    origin: u16,
    /// Symbol table (label -> address).
    symbols: HashMap<String, u16>,
    /// Pending references: (output_index, label, part, source_line).
    pending: Vec<(usize, String, Part, usize)>,
    /// Output words.
    output: Vec<u16>,
}

impl Assembler {
    fn new(origin: u16) -> Self {
        Self {
            origin,
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u16>, AssemblerError> {
        // Pass 1: collect labels and emit code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: patch label references
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.output))
    }

    fn current_addr(&self) -> i64 {
        self.origin as i64 + 2 * self.output.len() as i64
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut line = line.trim();

        // Label definitions, possibly followed by an instruction
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label '{}'", &line[..colon_idx]),
                });
            }
            let addr = self.current_addr();
            if addr > u16::MAX as i64 {
                return Err(AssemblerError::ValueOutOfRange { line: line_num, value: addr });
            }
            if self.symbols.insert(label.clone(), addr as u16).is_some() {
                return Err(AssemblerError::DuplicateLabel { line: line_num, label });
            }
            line = line[colon_idx + 1..].trim();
        }

        if line.is_empty() {
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (mnemonic, rest) = match line.find(char::is_whitespace) {
            Some(idx) => (&line[..idx], line[idx..].trim()),
            None => (line, ""),
        };
        let operands: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };

        if mnemonic.eq_ignore_ascii_case(".word") {
            let [value] = expect_operands::<1>(&operands, mnemonic, line_num)?;
            match self.parse_value(value, line_num)? {
                Value::Known(v) => {
                    let word = fit(v, i16::MIN as i64, u16::MAX as i64, line_num)?;
                    self.emit(word as u16);
                }
                Value::Label(label, part) => self.emit_pending(0, label, part, line_num),
            }
            return Ok(());
        }

        let op = Opcode::from_mnemonic(mnemonic).ok_or_else(|| AssemblerError::UnknownMnemonic {
            line: line_num,
            mnemonic: mnemonic.to_string(),
        })?;

        match op {
            Opcode::Halt => {
                expect_operands::<0>(&operands, mnemonic, line_num)?;
                self.emit(encode(&Instruction::Halt));
            }

            Opcode::LoadWord | Opcode::StoreWord => {
                let (reg, base, offset) = match operands.len() {
                    2 => (operands[0], operands[1], None),
                    3 => (operands[0], operands[1], Some(operands[2])),
                    n => return Err(operand_count(mnemonic, "2 or 3", n, line_num)),
                };
                let reg = parse_register(reg, line_num)?;
                let base = parse_register(base, line_num)?;
                let offset = match offset {
                    Some(text) => self.parse_known(text, line_num, 0, 0x1F)? as u8,
                    None => 0,
                };
                let instr = if op == Opcode::LoadWord {
                    Instruction::LoadWord { dest: reg, base, offset }
                } else {
                    Instruction::StoreWord { src: reg, base, offset }
                };
                self.emit(encode(&instr));
            }

            Opcode::LoadUpperImmediate | Opcode::AddImmediate => {
                let [dest, imm] = expect_operands::<2>(&operands, mnemonic, line_num)?;
                let dest = parse_register(dest, line_num)?;
                let make = |imm: u8| {
                    if op == Opcode::LoadUpperImmediate {
                        Instruction::LoadUpperImmediate { dest, imm }
                    } else {
                        Instruction::AddImmediate { dest, imm }
                    }
                };
                match self.parse_value(imm, line_num)? {
                    Value::Known(v) => {
                        let imm = fit(v, 0, 0xFF, line_num)? as u8;
                        self.emit(encode(&make(imm)));
                    }
                    Value::Label(label, Part::Full) => {
                        return Err(AssemblerError::SyntaxError {
                            line: line_num,
                            message: format!("'{}' needs hi() or lo() as an 8-bit immediate", label),
                        });
                    }
                    Value::Label(label, part) => {
                        self.emit_pending(encode(&make(0)), label, part, line_num);
                    }
                }
            }

            Opcode::Add | Opcode::Sub | Opcode::BranchEqual | Opcode::BranchNotEqual => {
                let [a, b, c] = expect_operands::<3>(&operands, mnemonic, line_num)?;
                let a = parse_register(a, line_num)?;
                let src1 = parse_register(b, line_num)?;
                let src2 = parse_register(c, line_num)?;
                let instr = match op {
                    Opcode::Add => Instruction::Add { dest: a, src1, src2 },
                    Opcode::Sub => Instruction::Sub { dest: a, src1, src2 },
                    Opcode::BranchEqual => Instruction::BranchEqual { offset: a, src1, src2 },
                    _ => Instruction::BranchNotEqual { offset: a, src1, src2 },
                };
                self.emit(encode(&instr));
            }

            Opcode::JumpAbsolute | Opcode::JumpRelative => {
                let [reg] = expect_operands::<1>(&operands, mnemonic, line_num)?;
                let reg = parse_register(reg, line_num)?;
                let instr = if op == Opcode::JumpAbsolute {
                    Instruction::JumpAbsolute { target: reg }
                } else {
                    Instruction::JumpRelative { offset: reg }
                };
                self.emit(encode(&instr));
            }
        }

        Ok(())
    }

    fn parse_value(&self, text: &str, line_num: usize) -> Result<Value, AssemblerError> {
        let text = text.trim();
        let lower = text.to_ascii_lowercase();

        for (prefix, part) in [("hi(", Part::High), ("lo(", Part::Low)] {
            if let Some(inner) = lower.strip_prefix(prefix) {
                let inner = inner.strip_suffix(')').ok_or_else(|| AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("unclosed '{}'", text),
                })?;
                return match parse_number(inner.trim()) {
                    Some(v) => Ok(Value::Known(select(v, part))),
                    None => Ok(Value::Label(inner.trim().to_uppercase(), part)),
                };
            }
        }

        if let Some(v) = parse_number(text) {
            return Ok(Value::Known(v));
        }

        if text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') && !text.is_empty() {
            return Ok(Value::Label(text.to_uppercase(), Part::Full));
        }

        Err(AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid value '{}'", text),
        })
    }

    /// Parse a value that must be a literal within `min..=max`.
    fn parse_known(&self, text: &str, line_num: usize, min: i64, max: i64) -> Result<i64, AssemblerError> {
        match self.parse_value(text, line_num)? {
            Value::Known(v) => fit(v, min, max, line_num),
            Value::Label(..) => Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("'{}' must be a number", text),
            }),
        }
    }

    fn emit(&mut self, word: u16) {
        self.output.push(word);
    }

    fn emit_pending(&mut self, word: u16, label: String, part: Part, line_num: usize) {
        self.pending.push((self.output.len(), label, part, line_num));
        self.emit(word);
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (out_idx, label, part, line_num) in &self.pending {
            let addr = self.symbols.get(label).ok_or_else(|| AssemblerError::UndefinedLabel {
                line: *line_num,
                label: label.clone(),
            })?;

            let word = &mut self.output[*out_idx];
            match part {
                Part::Full => *word = *addr,
                Part::High | Part::Low => *word = (*word & 0xFF00) | select(*addr as i64, *part) as u16,
            }
        }
        Ok(())
    }
}

fn select(value: i64, part: Part) -> i64 {
    match part {
        Part::Full => value,
        Part::High => (value >> 8) & 0xFF,
        Part::Low => value & 0xFF,
    }
}

fn parse_number(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let lower = digits.to_ascii_lowercase();

    let value = if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()?
    } else {
        lower.parse::<i64>().ok()?
    };

    Some(if negative { -value } else { value })
}

fn parse_register(text: &str, line_num: usize) -> Result<u8, AssemblerError> {
    let text = text.trim();
    text.strip_prefix('r')
        .or_else(|| text.strip_prefix('R'))
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| *n < 8)
        .ok_or_else(|| AssemblerError::BadRegister {
            line: line_num,
            name: text.to_string(),
        })
}

fn fit(value: i64, min: i64, max: i64, line_num: usize) -> Result<i64, AssemblerError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(AssemblerError::ValueOutOfRange { line: line_num, value })
    }
}

fn expect_operands<'a, const N: usize>(
    operands: &[&'a str],
    mnemonic: &str,
    line_num: usize,
) -> Result<[&'a str; N], AssemblerError> {
    <[&str; N]>::try_from(operands)
        .map_err(|_| operand_count(mnemonic, &N.to_string(), operands.len(), line_num))
}

fn operand_count(mnemonic: &str, expected: &str, found: usize, line_num: usize) -> AssemblerError {
    AssemblerError::SyntaxError {
        line: line_num,
        message: format!("{} takes {} operands, found {}", mnemonic, expected, found),
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("bad register on line {line}: {name}")]
    BadRegister { line: usize, name: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },
}
