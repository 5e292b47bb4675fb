//! CPU execution engine for the F4F.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//! Handlers check every fault condition before committing any mutation, so a
//! faulting instruction leaves registers, flags and memory as they were
//! (apart from the PC advance done by the fetch).

use crate::config::MachineConfig;
use crate::cpu::alu::{self, sign_extend};
use crate::cpu::decode::{self, Instruction};
use crate::cpu::fault::Fault;
use crate::cpu::memory::{check_word_address, Memory};
use crate::cpu::registers::{Flags, Registers};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HALT).
    Halted,
    /// CPU hit a fault.
    Faulted,
}

/// A fault together with the address of the instruction that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub pc: u16,
    pub fault: Fault,
}

/// Immutable view of the architectural state, for tracing and debuggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub pc: u16,
    pub registers: Vec<u16>,
    pub flags: Flags,
    pub state: CpuState,
    pub cycles: u64,
}

/// The F4F CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
    /// The fault that stopped the machine, if any.
    fault: Option<FaultRecord>,
}

impl Cpu {
    /// Create a new CPU with the default configuration.
    pub fn new() -> Self {
        Self::with_registers(MachineConfig::default().registers)
    }

    /// Create a CPU with `count` general-purpose registers.
    pub fn with_registers(count: usize) -> Self {
        Self {
            regs: Registers::new(count),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
            fault: None,
        }
    }

    /// Create a CPU shaped by a machine configuration.
    pub fn from_config(config: &MachineConfig) -> Self {
        Self::with_registers(config.registers)
    }

    /// Reset the CPU to its freshly constructed state.
    pub fn reset(&mut self) {
        log::debug!("reset");
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
        self.fault = None;
    }

    /// Copy a program image into memory and point the PC at its first byte.
    ///
    /// On failure nothing changes.
    pub fn load_image(&mut self, image: &[u8], start: u16) -> Result<(), Fault> {
        self.mem.load_image(image, start as usize)?;
        self.regs.set_pc(start);
        self.state = CpuState::Running;
        self.fault = None;
        log::debug!("loaded {} bytes at {:#06x}", image.len(), start);
        Ok(())
    }

    /// Reset and load `image` as one step. A failed load leaves the CPU as it was.
    pub fn reload(&mut self, image: &[u8], start: u16) -> Result<(), Fault> {
        let mut fresh = Cpu::with_registers(self.regs.count());
        fresh.load_image(image, start)?;
        *self = fresh;
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error. A fault moves
    /// the CPU to `Faulted`; stepping a stopped CPU changes nothing.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let pc = self.regs.pc();
        match self.cycle() {
            Ok(instr) => {
                self.cycles += 1;
                self.last_instr = Some(instr);
                log::trace!("{:#06x}: {:?}", pc, instr);
                Ok(instr)
            }
            Err(fault) => {
                self.state = CpuState::Faulted;
                self.fault = Some(FaultRecord { pc, fault });
                log::warn!("{} at pc={:#06x}", fault, pc);
                Err(CpuError::Fault { pc, fault })
            }
        }
    }

    /// Run until halt or fault.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Fetch, decode and execute one instruction.
    fn cycle(&mut self) -> Result<Instruction, Fault> {
        let word = self.mem.read_word(self.regs.pc() as usize)?;
        self.regs.advance_pc();
        let instr = decode::decode(word)?;
        self.execute(instr)?;
        Ok(instr)
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) -> Result<(), Fault> {
        match instr {
            Instruction::Halt => {
                self.state = CpuState::Halted;
                log::info!("halted after {} instructions", self.cycles + 1);
            }

            // ==================== Load / Store ====================

            Instruction::LoadWord { dest, base, offset } => {
                self.regs.check(dest)?;
                let addr = self.regs.get(base)? as usize + offset as usize;
                let value = self.mem.read_word(addr)?;
                self.regs.set(dest, value)?;
            }

            Instruction::StoreWord { src, base, offset } => {
                let value = self.regs.get(src)?;
                let addr = self.regs.get(base)? as usize + offset as usize;
                self.mem.write_word(addr, value)?;
            }

            // ==================== Immediates ====================

            Instruction::LoadUpperImmediate { dest, imm } => {
                self.regs.set(dest, (imm as u16) << 8)?;
            }

            Instruction::AddImmediate { dest, imm } => {
                let value = self.regs.get(dest)?.wrapping_add(imm as u16);
                self.regs.set(dest, value)?;
            }

            // ==================== Arithmetic ====================

            Instruction::Add { dest, src1, src2 } => {
                self.regs.check(dest)?;
                let (result, flags) = alu::add(self.regs.get(src1)?, self.regs.get(src2)?);
                self.regs.set(dest, result)?;
                self.regs.set_flags(flags);
            }

            Instruction::Sub { dest, src1, src2 } => {
                self.regs.check(dest)?;
                let (result, flags) = alu::sub(self.regs.get(src1)?, self.regs.get(src2)?);
                self.regs.set(dest, result)?;
                self.regs.set_flags(flags);
            }

            // ==================== Control Flow ====================

            Instruction::JumpAbsolute { target } => {
                let addr = self.regs.get(target)?;
                self.jump(addr as i64)?;
            }

            Instruction::JumpRelative { offset } => {
                let delta = sign_extend(self.regs.get(offset)?);
                self.jump(self.regs.pc() as i64 + delta as i64)?;
            }

            Instruction::BranchEqual { offset, src1, src2 } => {
                let delta = self.regs.get(offset)?;
                if self.regs.get(src1)? == self.regs.get(src2)? {
                    self.jump(self.regs.pc() as i64 + delta as i64)?;
                }
            }

            Instruction::BranchNotEqual { offset, src1, src2 } => {
                let delta = self.regs.get(offset)?;
                if self.regs.get(src1)? != self.regs.get(src2)? {
                    self.jump(self.regs.pc() as i64 + delta as i64)?;
                }
            }
        }

        Ok(())
    }

    /// Move the PC to `target` once it is known to be a fetchable word.
    fn jump(&mut self, target: i64) -> Result<(), Fault> {
        let addr = check_word_address(target)?;
        self.regs.set_pc(addr as u16);
        Ok(())
    }

    /// Capture the current architectural state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pc: self.regs.pc(),
            registers: self.regs.gprs().to_vec(),
            flags: self.regs.flags(),
            state: self.state,
            cycles: self.cycles,
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// The fault that stopped the CPU, if it faulted.
    pub fn fault(&self) -> Option<FaultRecord> {
        self.fault
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// Check if the CPU has faulted.
    pub fn is_faulted(&self) -> bool {
        self.state == CpuState::Faulted
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
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("fault", &self.fault)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("{fault} at pc={pc:#06x}")]
    Fault { pc: u16, fault: Fault },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;
    use crate::cpu::fault::IllegalReason;

    const ORIGIN: u16 = 0xC000;

    fn make_image(instructions: &[Instruction]) -> Vec<u8> {
        instructions
            .iter()
            .flat_map(|i| encode(i).to_le_bytes())
            .collect()
    }

    fn load(instructions: &[Instruction]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_image(&make_image(instructions), ORIGIN).unwrap();
        cpu
    }

    #[test]
    fn test_cpu_halt() {
        let mut cpu = load(&[Instruction::Halt]);

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 1);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.pc(), ORIGIN + 2);
    }

    #[test]
    fn test_load_image_sets_pc() {
        let mut cpu = Cpu::new();
        cpu.load_image(&[0xFF, 0x10, 0xFA, 0x32], 0xFFFC).unwrap();
        assert_eq!(cpu.regs.pc(), 0xFFFC);
        assert_eq!(cpu.mem.read_word(0xFFFC).unwrap(), 0x10FF);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_load_image_too_large_leaves_state() {
        let mut cpu = Cpu::new();
        cpu.regs.set_pc(0x1234);

        let result = cpu.load_image(&[1, 2, 3, 4], 0xFFFD);

        assert!(matches!(result, Err(Fault::OutOfBound { .. })));
        assert_eq!(cpu.regs.pc(), 0x1234);
        assert_eq!(cpu.mem.read_byte(0xFFFD).unwrap(), 0);
    }

    #[test]
    fn test_fetch_sequence() {
        let mut cpu = Cpu::new();
        cpu.load_image(&[0xFF, 0x00, 0xFA, 0x07], ORIGIN).unwrap();
        assert_eq!(cpu.mem.read_word(ORIGIN as usize).unwrap(), 0x00FF);
        assert_eq!(cpu.mem.read_word(ORIGIN as usize + 2).unwrap(), 0x07FA);
    }

    #[test]
    fn test_full_immediate() {
        let mut cpu = load(&[
            Instruction::LoadUpperImmediate { dest: 1, imm: 0x35 },
            Instruction::AddImmediate { dest: 1, imm: 0x7F },
            Instruction::Halt,
        ]);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(1).unwrap(), 0x357F);
        assert_eq!(cpu.regs.flags(), Flags::default());
    }

    #[test]
    fn test_lui_clears_low_byte() {
        let mut cpu = load(&[
            Instruction::LoadUpperImmediate { dest: 4, imm: 0xC2 },
            Instruction::Halt,
        ]);
        cpu.regs.set(4, 0x00FF).unwrap();

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(4).unwrap(), 0xC200);
    }

    #[test]
    fn test_addi_wraps() {
        let mut cpu = load(&[
            Instruction::LoadUpperImmediate { dest: 5, imm: 0xFF },
            Instruction::AddImmediate { dest: 5, imm: 0xFF },
            Instruction::AddImmediate { dest: 5, imm: 0x11 },
            Instruction::Halt,
        ]);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(5).unwrap(), 0x0010);
    }

    #[test]
    fn test_add_sets_carry() {
        let mut cpu = load(&[
            Instruction::Add { dest: 3, src1: 1, src2: 2 },
            Instruction::Halt,
        ]);
        cpu.regs.set(1, 0xFFFF).unwrap();
        cpu.regs.set(2, 20).unwrap();

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(3).unwrap(), 19);
        assert!(cpu.regs.flags().carry);
        assert!(!cpu.regs.flags().overflow);
    }

    #[test]
    fn test_sub_wraps_and_flags() {
        let mut cpu = load(&[
            Instruction::Sub { dest: 0, src1: 1, src2: 2 },
            Instruction::Halt,
        ]);
        cpu.regs.set(1, 1).unwrap();
        cpu.regs.set(2, 2).unwrap();

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(0).unwrap(), 0xFFFF);
        assert!(cpu.regs.flags().sign);
        assert!(cpu.regs.flags().carry);
        assert!(!cpu.regs.flags().zero);
    }

    #[test]
    fn test_load_word() {
        let mut cpu = load(&[
            Instruction::LoadWord { dest: 4, base: 5, offset: 2 },
            Instruction::Halt,
        ]);
        cpu.mem.write_word(12, 0x1F5A).unwrap();
        cpu.regs.set(5, 10).unwrap();

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(4).unwrap(), 0x1F5A);
    }

    #[test]
    fn test_load_word_misaligned() {
        let mut cpu = load(&[Instruction::LoadWord { dest: 4, base: 5, offset: 0 }]);
        cpu.regs.set(5, 11).unwrap();

        let err = cpu.step().unwrap_err();

        assert_eq!(err, CpuError::Fault { pc: ORIGIN, fault: Fault::Misaligned { addr: 11 } });
        assert!(cpu.is_faulted());
        assert_eq!(cpu.regs.get(4).unwrap(), 0);
    }

    #[test]
    fn test_load_word_past_top() {
        let mut cpu = load(&[Instruction::LoadWord { dest: 1, base: 2, offset: 2 }]);
        cpu.regs.set(2, 0xFFFE).unwrap();

        let err = cpu.step().unwrap_err();

        assert_eq!(
            err,
            CpuError::Fault { pc: ORIGIN, fault: Fault::OutOfBound { addr: 0x10000 } }
        );
    }

    #[test]
    fn test_store_word() {
        let mut cpu = load(&[
            Instruction::StoreWord { src: 3, base: 4, offset: 0 },
            Instruction::Halt,
        ]);
        cpu.regs.set(3, 12345).unwrap();
        cpu.regs.set(4, 20).unwrap();

        cpu.run().unwrap();

        assert_eq!(cpu.mem.read_word(20).unwrap(), 12345);
    }

    #[test]
    fn test_store_word_misaligned() {
        let mut cpu = load(&[Instruction::StoreWord { src: 3, base: 4, offset: 0 }]);
        cpu.regs.set(3, 0xABCD).unwrap();
        cpu.regs.set(4, 21).unwrap();

        assert!(cpu.step().is_err());
        assert_eq!(cpu.mem.read_byte(21).unwrap(), 0);
        assert_eq!(cpu.mem.read_byte(22).unwrap(), 0);
    }

    #[test]
    fn test_branch_equal_taken() {
        let mut cpu = Cpu::new();
        cpu.mem.write_word(0x100, encode(&Instruction::BranchEqual { offset: 3, src1: 1, src2: 2 })).unwrap();
        cpu.regs.set_pc(0x100);
        cpu.regs.set(1, 7).unwrap();
        cpu.regs.set(2, 7).unwrap();
        cpu.regs.set(3, 0x20).unwrap();

        cpu.step().unwrap();

        // PC after fetch is 0x102; 0x102 + 0x20 = 0x122.
        assert_eq!(cpu.regs.pc(), 0x122);
    }

    #[test]
    fn test_branch_equal_not_taken() {
        let mut cpu = Cpu::new();
        cpu.mem.write_word(0x100, encode(&Instruction::BranchEqual { offset: 3, src1: 1, src2: 2 })).unwrap();
        cpu.regs.set_pc(0x100);
        cpu.regs.set(1, 7).unwrap();
        cpu.regs.set(2, 8).unwrap();
        cpu.regs.set(3, 0x20).unwrap();

        cpu.step().unwrap();

        assert_eq!(cpu.regs.pc(), 0x102);
    }

    #[test]
    fn test_branch_not_equal() {
        let mut cpu = Cpu::new();
        cpu.mem.write_word(0x100, encode(&Instruction::BranchNotEqual { offset: 3, src1: 1, src2: 2 })).unwrap();
        cpu.regs.set_pc(0x100);
        cpu.regs.set(1, 1).unwrap();
        cpu.regs.set(3, 0x10).unwrap();

        cpu.step().unwrap();

        assert_eq!(cpu.regs.pc(), 0x112);
    }

    #[test]
    fn test_branch_equal_from_0xfe() {
        let branch = encode(&Instruction::BranchEqual { offset: 3, src1: 1, src2: 2 });

        let mut taken = Cpu::new();
        taken.mem.write_word(0xFE, branch).unwrap();
        taken.regs.set_pc(0xFE);
        taken.regs.set(3, 0x22).unwrap();
        taken.step().unwrap();
        assert_eq!(taken.regs.pc(), 0x122);

        let mut not_taken = Cpu::new();
        not_taken.mem.write_word(0xFE, branch).unwrap();
        not_taken.regs.set_pc(0xFE);
        not_taken.regs.set(2, 1).unwrap();
        not_taken.regs.set(3, 0x22).unwrap();
        not_taken.step().unwrap();
        assert_eq!(not_taken.regs.pc(), 0x100);
    }

    #[test]
    fn test_branch_offset_is_unsigned() {
        let mut cpu = Cpu::new();
        cpu.mem.write_word(0x100, encode(&Instruction::BranchEqual { offset: 3, src1: 1, src2: 2 })).unwrap();
        cpu.regs.set_pc(0x100);
        cpu.regs.set(3, 0x8000).unwrap();

        cpu.step().unwrap();

        assert_eq!(cpu.regs.pc(), 0x8102);
    }

    #[test]
    fn test_branch_offset_past_top() {
        let mut cpu = Cpu::new();
        cpu.mem.write_word(0x100, encode(&Instruction::BranchNotEqual { offset: 3, src1: 1, src2: 2 })).unwrap();
        cpu.regs.set_pc(0x100);
        cpu.regs.set(1, 1).unwrap();
        cpu.regs.set(3, 0xFFFC).unwrap();

        let err = cpu.step().unwrap_err();

        assert_eq!(err, CpuError::Fault { pc: 0x100, fault: Fault::OutOfBound { addr: 0x100FE } });
        assert_eq!(cpu.regs.pc(), 0x102);
    }

    #[test]
    fn test_branch_bad_target_keeps_pc() {
        let mut cpu = Cpu::new();
        cpu.mem.write_word(0x100, encode(&Instruction::BranchEqual { offset: 3, src1: 1, src2: 2 })).unwrap();
        cpu.regs.set_pc(0x100);
        cpu.regs.set(3, 0x21).unwrap();

        let err = cpu.step().unwrap_err();

        assert_eq!(err, CpuError::Fault { pc: 0x100, fault: Fault::Misaligned { addr: 0x123 } });
        assert_eq!(cpu.regs.pc(), 0x102);
    }

    #[test]
    fn test_jump_absolute() {
        let mut cpu = load(&[Instruction::JumpAbsolute { target: 2 }]);
        cpu.regs.set(2, 0x0400).unwrap();
        cpu.mem.write_word(0x0400, encode(&Instruction::Halt)).unwrap();

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 2);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.pc(), 0x0402);
    }

    #[test]
    fn test_jump_absolute_misaligned() {
        let mut cpu = load(&[Instruction::JumpAbsolute { target: 2 }]);
        cpu.regs.set(2, 0x0401).unwrap();

        let err = cpu.step().unwrap_err();

        assert_eq!(err, CpuError::Fault { pc: ORIGIN, fault: Fault::Misaligned { addr: 0x401 } });
        assert_eq!(cpu.regs.pc(), ORIGIN + 2);
    }

    #[test]
    fn test_jump_relative_backwards() {
        let mut cpu = load(&[
            Instruction::Halt,
            Instruction::JumpRelative { offset: 1 },
        ]);
        cpu.regs.set_pc(ORIGIN + 2);
        cpu.regs.set(1, (-4i16) as u16).unwrap();

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 2);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_jump_relative_below_zero() {
        let mut cpu = Cpu::new();
        cpu.mem.write_word(0, encode(&Instruction::JumpRelative { offset: 1 })).unwrap();
        cpu.regs.set(1, (-8i16) as u16).unwrap();

        let err = cpu.step().unwrap_err();

        assert_eq!(err, CpuError::Fault { pc: 0, fault: Fault::OutOfBound { addr: -6 } });
        assert_eq!(cpu.regs.pc(), 2);
    }

    #[test]
    fn test_illegal_opcode() {
        let mut cpu = Cpu::new();
        cpu.load_image(&[0x00, 0x00], ORIGIN).unwrap();

        let err = cpu.run().unwrap_err();

        assert_eq!(
            err,
            CpuError::Fault {
                pc: ORIGIN,
                fault: Fault::IllegalInstruction(IllegalReason::Opcode(0)),
            }
        );
        assert!(cpu.is_faulted());
        assert_eq!(cpu.regs.pc(), ORIGIN + 2);
        assert_eq!(cpu.fault().map(|r| r.pc), Some(ORIGIN));
    }

    #[test]
    fn test_illegal_register() {
        let mut cpu = Cpu::with_registers(3);
        cpu.load_image(&make_image(&[Instruction::Add { dest: 3, src1: 0, src2: 1 }]), ORIGIN)
            .unwrap();
        cpu.regs.set(0, 1).unwrap();

        let err = cpu.step().unwrap_err();

        assert_eq!(
            err,
            CpuError::Fault {
                pc: ORIGIN,
                fault: Fault::IllegalInstruction(IllegalReason::Register(3)),
            }
        );
        assert_eq!(cpu.regs.flags(), Flags::default());
    }

    #[test]
    fn test_fetch_past_top() {
        let mut cpu = Cpu::new();
        cpu.regs.set_pc(0xFFFF);

        let err = cpu.step().unwrap_err();

        assert_eq!(err, CpuError::Fault { pc: 0xFFFF, fault: Fault::Misaligned { addr: 0xFFFF } });
    }

    #[test]
    fn test_step_after_stop() {
        let mut cpu = load(&[Instruction::Halt]);
        cpu.step().unwrap();

        assert_eq!(cpu.step(), Err(CpuError::NotRunning(CpuState::Halted)));
        assert_eq!(cpu.cycles, 1);
    }

    #[test]
    fn test_run_limited() {
        let mut cpu = load(&[Instruction::JumpRelative { offset: 0 }]);
        cpu.regs.set(0, (-2i16) as u16).unwrap();

        let executed = cpu.run_limited(50).unwrap();

        assert_eq!(executed, 50);
        assert!(cpu.is_running());
        assert_eq!(cpu.regs.pc(), ORIGIN);
    }

    #[test]
    fn test_snapshot_and_reset() {
        let mut cpu = load(&[
            Instruction::LoadUpperImmediate { dest: 2, imm: 0x80 },
            Instruction::Add { dest: 2, src1: 2, src2: 2 },
            Instruction::Halt,
        ]);
        cpu.run().unwrap();

        let snap = cpu.snapshot();
        assert_eq!(snap.pc, ORIGIN + 6);
        assert_eq!(snap.registers[2], 0);
        assert!(snap.flags.zero && snap.flags.carry && snap.flags.overflow);
        assert_eq!(snap.state, CpuState::Halted);
        assert_eq!(snap.cycles, 3);

        cpu.reset();
        assert!(cpu.is_running());
        assert_eq!(cpu.snapshot().registers, vec![0; 6]);
        assert_eq!(cpu.mem.read_word(ORIGIN as usize).unwrap(), 0);
    }

    #[test]
    fn test_reload_replaces_state() {
        let mut cpu = load(&[Instruction::AddImmediate { dest: 1, imm: 9 }, Instruction::Halt]);
        cpu.run().unwrap();

        cpu.reload(&make_image(&[Instruction::Halt]), 0x0200).unwrap();

        assert!(cpu.is_running());
        assert_eq!(cpu.regs.pc(), 0x0200);
        assert_eq!(cpu.regs.get(1), Ok(0));
        assert_eq!(cpu.cycles, 0);
        assert_eq!(cpu.mem.read_word(ORIGIN as usize).unwrap(), 0);
    }

    #[test]
    fn test_failed_reload_keeps_state() {
        let mut cpu = load(&[Instruction::AddImmediate { dest: 1, imm: 9 }, Instruction::Halt]);
        cpu.run().unwrap();
        let before = cpu.snapshot();

        let err = cpu.reload(&[0; 4], 0xFFFE).unwrap_err();

        assert_eq!(err, Fault::OutOfBound { addr: 0x10001 });
        assert_eq!(cpu.snapshot(), before);
        assert_eq!(cpu.regs.get(1), Ok(9));
        assert_eq!(cpu.mem.read_word(ORIGIN as usize).unwrap(), encode(&Instruction::AddImmediate { dest: 1, imm: 9 }));
    }
}
