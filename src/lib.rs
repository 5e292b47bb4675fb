//! # F4F Emulator
//!
//! An emulator of the F4F, a small fixed-width 16-bit instruction set
//! designed for teaching instruction-set and emulator design.
//!
//! The core is the fetch-decode-execute engine in [`cpu`]. Assembling,
//! disassembling and program-image files live in [`asm`] and are never
//! needed by the core itself.

pub mod cpu;
pub mod config;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Fault, Flags, Instruction, Memory, Registers, Snapshot};
pub use config::{MachineConfig, ConfigError};
pub use asm::{assemble, disassemble, AssemblerError, ImageError, load_image_file, save_image_file};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
