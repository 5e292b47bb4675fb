//! Assembler, disassembler and program images for the F4F.
//!
//! None of this is used by the CPU core, which only ever sees raw words.

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, assemble_at, AssemblerError};
pub use disasm::{disassemble, disassemble_instruction};
pub use image::{load_image_file, save_image_file, words_to_bytes, bytes_to_words, ImageError};
