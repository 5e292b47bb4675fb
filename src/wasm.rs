//! WebAssembly bindings for the F4F emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::asm::{assemble_at, words_to_bytes};
use crate::asm::disasm::{disassemble_instruction, format_instruction};
use crate::{Cpu, MachineConfig};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    config: MachineConfig,
    image: Vec<u8>,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance with the default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        let config = MachineConfig::default();
        Self {
            cpu: Cpu::from_config(&config),
            config,
            image: Vec::new(),
        }
    }

    /// Create a CPU instance from a JSON machine configuration.
    #[wasm_bindgen]
    pub fn with_config(json: &str) -> Result<WasmCpu, JsError> {
        let config = MachineConfig::from_json(json)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        Ok(Self {
            cpu: Cpu::from_config(&config),
            config,
            image: Vec::new(),
        })
    }

    /// Load a program from assembly source code. Returns the word count.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let words = assemble_at(source, self.config.load_address)
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        self.load_bytes(&words_to_bytes(&words))?;
        Ok(words.len())
    }

    /// Load a raw program image.
    #[wasm_bindgen]
    pub fn load_bytes(&mut self, image: &[u8]) -> Result<(), JsError> {
        self.cpu.reload(image, self.config.load_address)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        self.image = image.to_vec();
        Ok(())
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let instr = self.cpu.step()
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        Ok(format_instruction(&instr))
    }

    /// Run until halt, fault, or `max_cycles` instructions.
    /// Returns the total instruction count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> u64 {
        let _ = self.cpu.run_limited(max_cycles as u64);
        self.cpu.cycles
    }

    /// Reset CPU to initial state with the loaded image.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        if self.image.is_empty() || self.cpu.reload(&self.image, self.config.load_address).is_err() {
            self.cpu.reset();
        }
    }

    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    #[wasm_bindgen]
    pub fn is_faulted(&self) -> bool {
        self.cpu.is_faulted()
    }

    /// Description of the fault that stopped the CPU, if any.
    #[wasm_bindgen]
    pub fn fault(&self) -> Option<String> {
        self.cpu.fault().map(|r| format!("{} at pc={:#06x}", r.fault, r.pc))
    }

    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.regs.pc()
    }

    /// General-purpose register value, or 0 for a register that does not exist.
    #[wasm_bindgen]
    pub fn register(&self, index: u8) -> u16 {
        self.cpu.regs.get(index).unwrap_or(0)
    }

    /// Status register bits (Z=1, C=2, V=4, S=8).
    #[wasm_bindgen]
    pub fn flags(&self) -> u8 {
        self.cpu.regs.flags().bits()
    }

    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// Memory word at `addr`, or 0 for an invalid word address.
    #[wasm_bindgen]
    pub fn memory_word(&self, addr: usize) -> u16 {
        self.cpu.mem.read_word(addr).unwrap_or(0)
    }

    /// A copy of `len` bytes starting at `start`.
    #[wasm_bindgen]
    pub fn memory_bytes(&self, start: usize, len: usize) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.cpu.mem.slice(start, len))
    }

    /// Machine state as a JSON string.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.snapshot())
            .map_err(|e| JsError::new(&format!("{}", e)))
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the encoded words.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<Vec<u16>, JsError> {
    crate::asm::assemble(source).map_err(|e| JsError::new(&format!("{}", e)))
}

/// Disassemble a single instruction word.
#[wasm_bindgen]
pub fn wasm_disassemble(word: u16) -> String {
    disassemble_instruction(word)
}
