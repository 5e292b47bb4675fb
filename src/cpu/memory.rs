//! F4F memory subsystem.
//!
//! A flat, byte-addressable space of 65,536 bytes. Words are two bytes,
//! little-endian, and must sit at even addresses.

use crate::cpu::fault::Fault;
use serde::{Serialize, Deserialize};

/// The number of bytes in the address space.
pub const MEMORY_SIZE: usize = 0x1_0000;

/// Highest valid byte address.
pub const TOP_ADDRESS: usize = MEMORY_SIZE - 1;

/// F4F memory: 64 KiB of bytes.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Create a new memory with all bytes zeroed.
    pub fn new() -> Self {
        Self {
            bytes: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a single byte.
    pub fn read_byte(&self, addr: usize) -> Result<u8, Fault> {
        self.bytes
            .get(addr)
            .copied()
            .ok_or(Fault::OutOfBound { addr: addr as i64 })
    }

    /// Write a single byte.
    pub fn write_byte(&mut self, addr: usize, value: u8) -> Result<(), Fault> {
        let cell = self
            .bytes
            .get_mut(addr)
            .ok_or(Fault::OutOfBound { addr: addr as i64 })?;
        *cell = value;
        Ok(())
    }

    /// Read the little-endian word at `addr`.
    pub fn read_word(&self, addr: usize) -> Result<u16, Fault> {
        let index = check_word_address(addr as i64)?;
        Ok(u16::from_le_bytes([self.bytes[index], self.bytes[index + 1]]))
    }

    /// Write a little-endian word at `addr`.
    pub fn write_word(&mut self, addr: usize, value: u16) -> Result<(), Fault> {
        let index = check_word_address(addr as i64)?;
        self.bytes[index..index + 2].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Copy `image` into memory starting at `start`.
    ///
    /// Nothing is written unless the whole image fits.
    pub fn load_image(&mut self, image: &[u8], start: usize) -> Result<(), Fault> {
        let end = start + image.len();
        if end > MEMORY_SIZE {
            return Err(Fault::OutOfBound { addr: end as i64 - 1 });
        }
        self.bytes[start..end].copy_from_slice(image);
        Ok(())
    }

    /// Borrow a range of bytes, clamped to the end of memory.
    pub fn slice(&self, start: usize, len: usize) -> &[u8] {
        let start = start.min(MEMORY_SIZE);
        let end = start.saturating_add(len).min(MEMORY_SIZE);
        &self.bytes[start..end]
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Dump memory as (address, word) pairs (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u16)> {
        let start = start & !1;
        (0..count)
            .map(|i| start + i * 2)
            .take_while(|&addr| addr < MEMORY_SIZE)
            .map(|addr| (addr, u16::from_le_bytes([self.bytes[addr], self.bytes[addr + 1]])))
            .collect()
    }
}

/// Validate a word address: even, and both bytes inside memory.
///
/// Alignment is checked first, so an odd address always reports
/// `Misaligned` regardless of where it points.
pub fn check_word_address(addr: i64) -> Result<usize, Fault> {
    if addr & 1 != 0 {
        return Err(Fault::Misaligned { addr });
    }
    if addr < 0 || addr + 1 > TOP_ADDRESS as i64 {
        return Err(Fault::OutOfBound { addr });
    }
    Ok(addr as usize)
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.bytes.iter().filter(|b| **b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_bytes", &non_zero)
            .field("total_bytes", &MEMORY_SIZE)
            .finish()
    }
}
